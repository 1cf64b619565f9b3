use super::{output_json, spinner};
use crate::OutputFormat;
use anyhow::Result;
use console::style;
use lhremote_core::Orchestrator;
use lhremote_core::campaign::CampaignTiming;
use lhremote_core::model::{CampaignRunState, RunnerState};
use serde_json::json;

pub async fn start(
    orchestrator: &Orchestrator,
    account_id: Option<i64>,
    campaign_id: i64,
    person_ids: Vec<i64>,
    format: OutputFormat,
) -> Result<()> {
    let account_id = orchestrator.resolve_account(account_id).await?;
    let timing = CampaignTiming::default();
    let persons = person_ids.len();

    let progress = spinner(format, format!("Starting campaign {}...", campaign_id));
    let result = orchestrator
        .start_campaign(account_id, campaign_id, person_ids, timing)
        .await;
    progress.finish_and_clear();
    result?;

    report(
        format,
        campaign_id,
        RunnerState::Campaigns,
        &format!("Campaign {} is running ({} persons queued)", campaign_id, persons),
    )
}

pub async fn stop(
    orchestrator: &Orchestrator,
    account_id: Option<i64>,
    campaign_id: i64,
    format: OutputFormat,
) -> Result<()> {
    let account_id = orchestrator.resolve_account(account_id).await?;
    let timing = CampaignTiming::default();

    let progress = spinner(format, format!("Stopping campaign {}...", campaign_id));
    let result = orchestrator
        .stop_campaign(account_id, campaign_id, timing)
        .await;
    progress.finish_and_clear();
    result?;

    report(
        format,
        campaign_id,
        RunnerState::Idle,
        &format!("Campaign {} stopped", campaign_id),
    )
}

pub async fn retry(
    orchestrator: &Orchestrator,
    account_id: Option<i64>,
    campaign_id: i64,
    person_ids: Vec<i64>,
    format: OutputFormat,
) -> Result<()> {
    let account_id = orchestrator.resolve_account(account_id).await?;

    let report = orchestrator
        .retry_campaign(account_id, campaign_id, person_ids)
        .await?;

    match format {
        OutputFormat::Json => output_json(&report),
        OutputFormat::Pretty => {
            println!(
                "{} Re-queued {} person(s) on campaign {} ({} result(s) cleared)",
                style("✓").green(),
                report.persons_requeued,
                campaign_id,
                report.results_cleared
            );
            println!(
                "  {}",
                style("Run `lhremote campaign start` to process them").dim()
            );
            Ok(())
        }
    }
}

pub async fn status(
    orchestrator: &Orchestrator,
    account_id: Option<i64>,
    campaign_id: i64,
    format: OutputFormat,
) -> Result<()> {
    let account_id = orchestrator.resolve_account(account_id).await?;

    let state = orchestrator.campaign_status(account_id, campaign_id).await?;

    match format {
        OutputFormat::Json => output_json(&state),
        OutputFormat::Pretty => {
            output_pretty(&state);
            Ok(())
        }
    }
}

fn report(format: OutputFormat, campaign_id: i64, state: RunnerState, message: &str) -> Result<()> {
    match format {
        OutputFormat::Json => output_json(&json!({
            "campaignId": campaign_id,
            "runnerState": state,
        })),
        OutputFormat::Pretty => {
            println!("{} {}", style("✓").green(), message);
            Ok(())
        }
    }
}

fn output_pretty(state: &CampaignRunState) {
    println!(
        "{}",
        style(format!("Campaign {}", state.campaign_id)).bold().cyan()
    );
    println!("  State:  {}", state.campaign_state.as_str());
    println!("  Paused: {}", if state.is_paused { "yes" } else { "no" });
    println!("  Runner: {}", style(state.runner_state).yellow());

    if state.action_counts.is_empty() {
        return;
    }

    println!("\n{}", style("Actions").bold());
    println!(
        "  {:<24} {:>8} {:>10} {:>10} {:>8}",
        "type", "queued", "processing", "successful", "failed"
    );
    for action in &state.action_counts {
        println!(
            "  {:<24} {:>8} {:>10} {:>10} {:>8}",
            action.action_type, action.queued, action.processing, action.successful, action.failed
        );
    }
}
