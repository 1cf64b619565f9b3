use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot connect to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("CDP call '{method}' timed out after {}ms", .timeout.as_millis())]
    Timeout { method: String, timeout: Duration },

    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("Target discovery failed on port {port}: {reason}")]
    Discovery { port: u16, reason: String },

    #[error(
        "Refusing to connect to non-loopback host '{host}' without --allow-remote"
    )]
    RemoteHostNotAllowed { host: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn connection(endpoint: impl ToString, reason: impl ToString) -> Self {
        Error::Connection {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
