use super::{LauncherApi, decode, ensure_accepted};
use crate::bridge::{self, LAUNCHER_API};
use crate::Result;
use crate::model::{Account, UiHealth};
use async_trait::async_trait;
use lhremote_cdp::{CdpSession, Endpoint};
use serde_json::{Value, json};
use std::time::Duration;

/// Launcher RPC over a CDP session to the launcher window
pub struct LauncherService {
    session: CdpSession,
}

impl LauncherService {
    pub async fn connect(endpoint: &Endpoint, call_timeout: Duration) -> Result<Self> {
        tracing::debug!("Connecting to launcher at {}", endpoint);
        let session = CdpSession::connect(endpoint)
            .await?
            .with_call_timeout(call_timeout);
        Ok(Self::from_session(session))
    }

    pub fn from_session(session: CdpSession) -> Self {
        Self { session }
    }

    async fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        let expression = bridge::invoke(LAUNCHER_API, method, args);
        Ok(self.session.evaluate(&expression, None).await?)
    }
}

#[async_trait]
impl LauncherApi for LauncherService {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let value = self.invoke("listAccounts", &[]).await?;
        decode("list-accounts", value)
    }

    async fn start_instance(&self, account_id: i64) -> Result<()> {
        tracing::info!(account_id, "Requesting instance start");
        let value = self.invoke("startInstance", &[json!(account_id)]).await?;
        ensure_accepted("start-instance", &value)
    }

    async fn stop_instance(&self, account_id: i64) -> Result<()> {
        tracing::info!(account_id, "Requesting instance stop");
        let value = self.invoke("stopInstance", &[json!(account_id)]).await?;
        ensure_accepted("stop-instance", &value)
    }

    async fn check_ui_health(&self, account_id: i64) -> Result<UiHealth> {
        let value = self.invoke("checkUiHealth", &[json!(account_id)]).await?;
        decode("check-ui-health", value)
    }

    async fn disconnect(&mut self) {
        self.session.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::testing::mock_page;

    async fn launcher() -> LauncherService {
        let url = mock_page(|expression| {
            if expression.contains("api.listAccounts()") {
                Ok(json!([
                    {"id": 1, "externalId": 1001, "name": "Alice", "email": "alice@example.com"},
                    {"id": 2, "externalId": 1002, "name": "Bob"}
                ]))
            } else if expression.contains("api.startInstance(1)") {
                Ok(json!({"success": true}))
            } else if expression.contains("api.startInstance(2)") {
                Ok(json!({"success": false, "error": "license expired"}))
            } else if expression.contains("api.stopInstance(1)") {
                Ok(Value::Null)
            } else if expression.contains("api.checkUiHealth(1)") {
                Ok(json!({"healthy": false, "issues": ["captcha shown"]}))
            } else {
                Err("TypeError: api is undefined".to_string())
            }
        })
        .await;
        LauncherService::from_session(CdpSession::connect_url(&url).await.unwrap())
    }

    #[tokio::test]
    async fn test_list_accounts() {
        let mut launcher = launcher().await;
        let accounts = launcher.list_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].email.as_deref(), Some("alice@example.com"));
        assert_eq!(accounts[1].name, "Bob");
        launcher.disconnect().await;
    }

    #[tokio::test]
    async fn test_start_and_stop_instance() {
        let launcher = launcher().await;
        launcher.start_instance(1).await.unwrap();
        launcher.stop_instance(1).await.unwrap();

        let err = launcher.start_instance(2).await.unwrap_err();
        assert!(matches!(err, Error::Rejected { ref message, .. } if message == "license expired"));
    }

    #[tokio::test]
    async fn test_check_ui_health() {
        let launcher = launcher().await;
        let health = launcher.check_ui_health(1).await.unwrap();
        assert!(!health.healthy);
        assert_eq!(health.issues, vec!["captcha shown".to_string()]);
    }

    #[tokio::test]
    async fn test_script_exception_surfaces_as_evaluation_error() {
        let launcher = launcher().await;
        let err = launcher.check_ui_health(99).await.unwrap_err();
        assert!(matches!(err, Error::Cdp(lhremote_cdp::Error::Evaluation(_))));
    }

    #[tokio::test]
    async fn test_disconnect_twice() {
        let mut launcher = launcher().await;
        launcher.disconnect().await;
        launcher.disconnect().await;
        assert!(launcher.list_accounts().await.is_err());
    }
}
