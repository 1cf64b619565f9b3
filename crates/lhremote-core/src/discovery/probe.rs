use super::HandshakeProbe;
use async_trait::async_trait;
use lhremote_cdp::{Endpoint, discover_targets_with_timeout};
use std::time::Duration;

/// Default bound on a single handshake probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Probes a port by listing its CDP targets over HTTP
#[derive(Debug, Clone)]
pub struct HttpHandshakeProbe {
    host: Endpoint,
    timeout: Duration,
}

impl HttpHandshakeProbe {
    /// Probe ports on the same host as `endpoint`
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            host: endpoint,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HandshakeProbe for HttpHandshakeProbe {
    async fn probe(&self, port: u16) -> bool {
        let endpoint = self.host.with_port(port);
        match discover_targets_with_timeout(&endpoint, self.timeout).await {
            Ok(targets) => {
                tracing::debug!(port, targets = targets.len(), "Handshake succeeded");
                true
            }
            Err(e) => {
                tracing::trace!(port, "Handshake failed: {}", e);
                false
            }
        }
    }
}
