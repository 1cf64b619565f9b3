use crate::model::RunnerState;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why automatic account resolution could not pick an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountResolutionReason {
    NoAccounts,
    MultipleAccounts { count: usize },
}

impl fmt::Display for AccountResolutionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountResolutionReason::NoAccounts => {
                write!(f, "no accounts are configured in the launcher")
            }
            AccountResolutionReason::MultipleAccounts { count } => write!(
                f,
                "{} accounts are configured in the launcher; pass --account-id to pick one",
                count
            ),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Cdp(#[from] lhremote_cdp::Error),

    #[error("Cannot resolve account: {reason}")]
    AccountResolution { reason: AccountResolutionReason },

    #[error("Instance for account {account_id} is not running")]
    InstanceNotRunning { account_id: i64 },

    #[error("Launcher rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    #[error("Unexpected response from {operation}: {reason}")]
    Protocol { operation: String, reason: String },

    #[error("Campaign {campaign_id} not found")]
    CampaignNotFound { campaign_id: i64 },

    #[error("Campaign {campaign_id} failed to execute: {message}")]
    CampaignExecution { campaign_id: i64, message: String },

    #[error(
        "Campaign {campaign_id} runner did not reach '{expected}' within {}s",
        .timeout.as_secs()
    )]
    CampaignTimeout {
        campaign_id: i64,
        expected: RunnerState,
        timeout: Duration,
    },

    #[error("Database for account {account_id} not found at {}", .path.display())]
    DatabaseNotFound { account_id: i64, path: PathBuf },

    #[error("Database is open read-only; {operation} needs write access")]
    ReadOnlyDatabase { operation: &'static str },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the launcher's debug endpoint could not be reached
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Cdp(lhremote_cdp::Error::Connection { .. }))
    }

    /// True for failures a caller may reasonably retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::CampaignTimeout { .. } | Error::Cdp(lhremote_cdp::Error::Timeout { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
