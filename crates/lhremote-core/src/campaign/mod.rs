//! Campaign control: remote start/stop confirmed by polling the runner, and
//! database-side retry.
//!
//! The runner moves `idle -> campaigns -> stopping-campaigns -> idle` on its
//! own; these operations only request transitions and observe the result.

pub mod repository;

use crate::context::{DatabaseContext, InstanceDatabaseContext};
use crate::db::Database;
use crate::model::{ActionResult, CampaignRunState, RetryReport, RunnerState};
use crate::poll::{PollTiming, poll_until};
use crate::services::{InstanceApi, START_CAMPAIGN_ACTION, STOP_CAMPAIGN_ACTION};
use crate::{Error, Result};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CampaignTiming {
    pub poll: PollTiming,
}

impl Default for CampaignTiming {
    fn default() -> Self {
        Self {
            poll: PollTiming::new(Duration::from_millis(500), Duration::from_secs(30)),
        }
    }
}

/// Start `campaign_id` for `person_ids` and wait until the runner is
/// executing campaigns. Needs a writable handle.
pub async fn start(
    ctx: &mut InstanceDatabaseContext<'_, Database>,
    campaign_id: i64,
    person_ids: &[i64],
    timing: &CampaignTiming,
) -> Result<()> {
    ctx.db.require_writable("campaign start")?;
    repository::require_campaign(ctx.db.connection(), campaign_id)?;

    tracing::info!(campaign_id, persons = person_ids.len(), "Starting campaign");
    let result = ctx
        .instance
        .execute_action(
            START_CAMPAIGN_ACTION,
            json!({"campaignId": campaign_id, "personIds": person_ids}),
        )
        .await?;
    ensure_executed(campaign_id, result)?;

    wait_for_runner(ctx.instance, campaign_id, RunnerState::Campaigns, timing).await
}

/// Pause `campaign_id` and wait until the runner is idle
pub async fn stop(
    ctx: &mut InstanceDatabaseContext<'_, Database>,
    campaign_id: i64,
    timing: &CampaignTiming,
) -> Result<()> {
    repository::require_campaign(ctx.db.connection(), campaign_id)?;

    tracing::info!(campaign_id, "Stopping campaign");
    let result = ctx
        .instance
        .execute_action(STOP_CAMPAIGN_ACTION, json!({"campaignId": campaign_id}))
        .await?;
    ensure_executed(campaign_id, result)?;

    wait_for_runner(ctx.instance, campaign_id, RunnerState::Idle, timing).await
}

/// Re-queue `person_ids` on the campaign's first action, discarding their
/// earlier results. Does not start the campaign.
pub fn retry(
    ctx: &mut DatabaseContext<'_, Database>,
    campaign_id: i64,
    person_ids: &[i64],
) -> Result<RetryReport> {
    ctx.db.require_writable("campaign retry")?;
    repository::require_campaign(ctx.db.connection(), campaign_id)?;

    let tx = ctx.db.connection_mut().transaction()?;
    let report = repository::reset_persons(&tx, campaign_id, person_ids)?;
    tx.commit()?;

    tracing::info!(
        campaign_id,
        requeued = report.persons_requeued,
        cleared = report.results_cleared,
        "Campaign persons reset"
    );
    Ok(report)
}

/// Read the campaign record, its queue counts and the runner state
pub async fn status(
    ctx: &mut InstanceDatabaseContext<'_, Database>,
    campaign_id: i64,
) -> Result<CampaignRunState> {
    let campaign = repository::require_campaign(ctx.db.connection(), campaign_id)?;
    let action_counts = repository::action_counts(ctx.db.connection(), campaign_id)?;
    let runner_state = ctx.instance.runner_state().await?;

    Ok(CampaignRunState {
        campaign_id,
        campaign_state: campaign.state,
        is_paused: campaign.is_paused,
        runner_state,
        action_counts,
    })
}

fn ensure_executed(campaign_id: i64, result: ActionResult) -> Result<()> {
    if result.success {
        return Ok(());
    }
    Err(Error::CampaignExecution {
        campaign_id,
        message: result
            .message
            .unwrap_or_else(|| "instance reported failure".to_string()),
    })
}

async fn wait_for_runner(
    instance: &dyn InstanceApi,
    campaign_id: i64,
    expected: RunnerState,
    timing: &CampaignTiming,
) -> Result<()> {
    let reached = poll_until(timing.poll, move || async move {
        let state = instance.runner_state().await?;
        tracing::debug!(campaign_id, %state, %expected, "Runner state");
        Ok::<_, Error>((state == expected).then_some(()))
    })
    .await?;

    match reached {
        Some(()) => {
            tracing::info!(campaign_id, state = %expected, "Runner reached state");
            Ok(())
        }
        None => Err(Error::CampaignTimeout {
            campaign_id,
            expected,
            timeout: timing.poll.timeout,
        }),
    }
}
