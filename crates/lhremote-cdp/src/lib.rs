//! Chrome DevTools Protocol plumbing for talking to the launcher application
//! and its per-account instances.

mod endpoint;
mod error;
mod session;
mod targets;

pub use endpoint::{DEFAULT_CDP_HOST, DEFAULT_CDP_PORT, Endpoint};
pub use error::{Error, Result};
pub use session::{CdpSession, DEFAULT_CALL_TIMEOUT};
#[cfg(any(test, feature = "test-util"))]
pub use targets::test_server;
pub use targets::{
    DEFAULT_DISCOVERY_TIMEOUT, TARGET_LIST_PATH, Target, discover_targets,
    discover_targets_with_timeout,
};
