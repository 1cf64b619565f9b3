use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An automation identity managed by the launcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub external_id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Result of the launcher's UI health check for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiHealth {
    pub healthy: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// Result envelope of a named action executed by an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

/// A candidate instance process found by OS introspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredInstance {
    pub pid: u32,
    pub cdp_port: u16,
    /// Whether the port passed the CDP handshake probe
    pub connectable: bool,
}

/// Outcome of a start-instance attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstanceOutcome {
    AlreadyRunning { port: u16 },
    Started { port: u16 },
    /// The instance did not expose a connectable port in time. It may still be
    /// starting.
    Timeout,
}

impl InstanceOutcome {
    pub fn port(&self) -> Option<u16> {
        match self {
            InstanceOutcome::AlreadyRunning { port } | InstanceOutcome::Started { port } => {
                Some(*port)
            }
            InstanceOutcome::Timeout => None,
        }
    }
}

/// Outcome of a stop-instance attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    /// The instance ignored the stop request and its processes were killed
    Killed { processes: usize },
    Timeout,
}

/// State of the remote campaign runner, as reported by the instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunnerState {
    Idle,
    Campaigns,
    StoppingCampaigns,
}

impl RunnerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerState::Idle => "idle",
            RunnerState::Campaigns => "campaigns",
            RunnerState::StoppingCampaigns => "stopping-campaigns",
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a campaign record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignState {
    Active,
    Paused,
    Archived,
    Invalid,
}

impl CampaignState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignState::Active => "active",
            CampaignState::Paused => "paused",
            CampaignState::Archived => "archived",
            CampaignState::Invalid => "invalid",
        }
    }
}

/// Queue progress of one campaign action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCounts {
    pub action_id: i64,
    pub action_type: String,
    pub queued: u64,
    pub processing: u64,
    pub successful: u64,
    pub failed: u64,
}

/// Snapshot of a campaign's state. Valid only at the moment it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRunState {
    pub campaign_id: i64,
    pub campaign_state: CampaignState,
    pub is_paused: bool,
    pub runner_state: RunnerState,
    pub action_counts: Vec<ActionCounts>,
}

/// Summary of a retry reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryReport {
    pub persons_requeued: usize,
    pub results_cleared: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_from_launcher_payload() {
        let account: Account = serde_json::from_value(json!({
            "id": 3, "externalId": 123456, "name": "Jane Doe"
        }))
        .unwrap();
        assert_eq!(account.id, 3);
        assert_eq!(account.external_id, 123456);
        assert_eq!(account.email, None);
    }

    #[test]
    fn test_runner_state_wire_names() {
        let state: RunnerState = serde_json::from_value(json!("stopping-campaigns")).unwrap();
        assert_eq!(state, RunnerState::StoppingCampaigns);
        assert_eq!(RunnerState::Campaigns.to_string(), "campaigns");
        assert!(serde_json::from_value::<RunnerState>(json!("running")).is_err());
    }

    #[test]
    fn test_instance_outcome_is_tagged() {
        let json = serde_json::to_value(InstanceOutcome::AlreadyRunning { port: 40111 }).unwrap();
        assert_eq!(json, json!({"status": "already_running", "port": 40111}));
        assert_eq!(
            serde_json::to_value(InstanceOutcome::Timeout).unwrap(),
            json!({"status": "timeout"})
        );
        assert_eq!(InstanceOutcome::Started { port: 1 }.port(), Some(1));
        assert_eq!(InstanceOutcome::Timeout.port(), None);
    }

    #[test]
    fn test_action_result_defaults() {
        let result: ActionResult = serde_json::from_value(json!({"success": false})).unwrap();
        assert!(!result.success);
        assert_eq!(result.message, None);
        assert!(result.data.is_null());
    }
}
