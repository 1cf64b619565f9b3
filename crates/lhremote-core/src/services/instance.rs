use super::{InstanceApi, decode};
use crate::bridge::{self, INSTANCE_API};
use crate::Result;
use crate::model::{ActionResult, RunnerState};
use async_trait::async_trait;
use lhremote_cdp::{CdpSession, Endpoint};
use serde_json::{Value, json};
use std::time::Duration;

/// Action that unpauses a campaign and queues the given persons
pub const START_CAMPAIGN_ACTION: &str = "campaign.start";

/// Action that pauses a campaign
pub const STOP_CAMPAIGN_ACTION: &str = "campaign.pause";

/// Instance RPC over a CDP session to an instance window
pub struct InstanceService {
    session: CdpSession,
}

impl InstanceService {
    pub async fn connect(endpoint: &Endpoint, call_timeout: Duration) -> Result<Self> {
        tracing::debug!("Connecting to instance at {}", endpoint);
        let session = CdpSession::connect(endpoint)
            .await?
            .with_call_timeout(call_timeout);
        Ok(Self::from_session(session))
    }

    pub fn from_session(session: CdpSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl InstanceApi for InstanceService {
    async fn execute_action(&self, action_type: &str, params: Value) -> Result<ActionResult> {
        tracing::debug!(action_type, "Executing instance action");
        let expression = bridge::invoke(INSTANCE_API, "executeAction", &[json!(action_type), params]);
        let value = self.session.evaluate(&expression, None).await?;
        decode(action_type, value)
    }

    async fn runner_state(&self) -> Result<RunnerState> {
        let expression = bridge::invoke(INSTANCE_API, "getRunnerState", &[]);
        let value = self.session.evaluate(&expression, None).await?;
        decode("runner-state", value)
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

    async fn instance() -> InstanceService {
        let url = mock_page(|expression| {
            if expression.contains(r#"api.executeAction("campaign.start", {"campaignId":5"#) {
                Ok(json!({"success": true}))
            } else if expression.contains(r#"api.executeAction("campaign.pause""#) {
                Ok(json!({"success": false, "message": "campaign is archived"}))
            } else if expression.contains("api.getRunnerState()") {
                Ok(json!("stopping-campaigns"))
            } else {
                Ok(json!({"unexpected": true}))
            }
        })
        .await;
        InstanceService::from_session(CdpSession::connect_url(&url).await.unwrap())
    }

    #[tokio::test]
    async fn test_execute_action_returns_envelope() {
        let instance = instance().await;

        let ok = instance
            .execute_action(START_CAMPAIGN_ACTION, json!({"campaignId": 5, "personIds": []}))
            .await
            .unwrap();
        assert!(ok.success);

        let rejected = instance
            .execute_action(STOP_CAMPAIGN_ACTION, json!({"campaignId": 5}))
            .await
            .unwrap();
        assert!(!rejected.success);
        assert_eq!(rejected.message.as_deref(), Some("campaign is archived"));
    }

    #[tokio::test]
    async fn test_execute_action_malformed_reply() {
        let instance = instance().await;
        let err = instance
            .execute_action("profile.visit", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol { ref operation, .. } if operation == "profile.visit"));
    }

    #[tokio::test]
    async fn test_runner_state() {
        let mut instance = instance().await;
        assert_eq!(
            instance.runner_state().await.unwrap(),
            RunnerState::StoppingCampaigns
        );
        instance.disconnect().await;
        instance.disconnect().await;
    }
}
