pub mod account;
pub mod bridge;
pub mod campaign;
pub mod context;
pub mod db;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod orchestrator;
pub mod poll;
pub mod services;

#[cfg(test)]
mod testing;

pub use account::resolve_account;
pub use context::{
    DatabaseContext, InstanceDatabaseContext, with_database, with_instance_database, with_launcher,
};
pub use db::{AccessMode, Database, DatabaseLocator, DatabaseProvider};
pub use error::{AccountResolutionReason, Error, Result};
pub use lifecycle::{LifecycleTiming, start_instance_with_recovery};
pub use orchestrator::Orchestrator;
pub use poll::PollTiming;
