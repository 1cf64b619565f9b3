//! Typed façades over CDP sessions to the launcher and its instances.

mod instance;
mod launcher;

pub use instance::{InstanceService, START_CAMPAIGN_ACTION, STOP_CAMPAIGN_ACTION};
pub use launcher::LauncherService;

use crate::Result;
use crate::model::{Account, ActionResult, RunnerState, UiHealth};
use async_trait::async_trait;
use lhremote_cdp::{DEFAULT_CALL_TIMEOUT, Endpoint};
use serde_json::Value;
use std::time::Duration;

/// RPC surface of the launcher process
#[async_trait]
pub trait LauncherApi: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    async fn start_instance(&self, account_id: i64) -> Result<()>;

    async fn stop_instance(&self, account_id: i64) -> Result<()>;

    async fn check_ui_health(&self, account_id: i64) -> Result<UiHealth>;

    /// Release the connection. Safe to call more than once.
    async fn disconnect(&mut self);
}

/// RPC surface of one per-account instance process
#[async_trait]
pub trait InstanceApi: Send + Sync {
    /// Dispatch a named action to the instance's automation engine
    async fn execute_action(&self, action_type: &str, params: Value) -> Result<ActionResult>;

    async fn runner_state(&self) -> Result<RunnerState>;

    /// Release the connection. Safe to call more than once.
    async fn disconnect(&mut self);
}

/// Opens service connections
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect_launcher(&self, endpoint: &Endpoint) -> Result<Box<dyn LauncherApi>>;

    async fn connect_instance(&self, endpoint: &Endpoint) -> Result<Box<dyn InstanceApi>>;
}

/// Connects real CDP-backed services
#[derive(Debug, Clone)]
pub struct CdpConnector {
    call_timeout: Duration,
}

impl CdpConnector {
    pub fn new(call_timeout: Duration) -> Self {
        Self { call_timeout }
    }
}

impl Default for CdpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT)
    }
}

#[async_trait]
impl Connector for CdpConnector {
    async fn connect_launcher(&self, endpoint: &Endpoint) -> Result<Box<dyn LauncherApi>> {
        let launcher = LauncherService::connect(endpoint, self.call_timeout).await?;
        Ok(Box::new(launcher))
    }

    async fn connect_instance(&self, endpoint: &Endpoint) -> Result<Box<dyn InstanceApi>> {
        let instance = InstanceService::connect(endpoint, self.call_timeout).await?;
        Ok(Box::new(instance))
    }
}

/// Decode an RPC result, naming the operation on failure
pub(crate) fn decode<T: serde::de::DeserializeOwned>(operation: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| crate::Error::Protocol {
        operation: operation.to_string(),
        reason: e.to_string(),
    })
}

/// Fail when an RPC result is an explicit `{ success: false }` envelope
pub(crate) fn ensure_accepted(operation: &str, value: &Value) -> Result<()> {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = value
            .get("error")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("no reason given")
            .to_string();
        return Err(crate::Error::Rejected {
            operation: operation.to_string(),
            message,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    #[test]
    fn test_ensure_accepted() {
        assert!(ensure_accepted("start-instance", &Value::Null).is_ok());
        assert!(ensure_accepted("start-instance", &json!({"success": true})).is_ok());

        let err = ensure_accepted(
            "start-instance",
            &json!({"success": false, "error": "account is locked"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Rejected { ref message, .. } if message == "account is locked"));
    }

    #[test]
    fn test_decode_names_operation() {
        let err = decode::<Vec<Account>>("list-accounts", json!({"nope": 1})).unwrap_err();
        match err {
            Error::Protocol { operation, .. } => assert_eq!(operation, "list-accounts"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
