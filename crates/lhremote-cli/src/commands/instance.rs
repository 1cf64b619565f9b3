use super::{output_json, spinner};
use crate::OutputFormat;
use anyhow::{Context, Result, bail};
use console::style;
use lhremote_core::Orchestrator;
use lhremote_core::model::{DiscoveredInstance, InstanceOutcome, StopOutcome};
use serde_json::json;

/// Start the account's instance, or report the one already running
pub async fn start(
    orchestrator: &Orchestrator,
    account_id: Option<i64>,
    format: OutputFormat,
) -> Result<()> {
    let account_id = orchestrator.resolve_account(account_id).await?;

    let progress = spinner(format, format!("Starting instance for account {}...", account_id));
    let outcome = orchestrator.start_instance(account_id).await;
    progress.finish_and_clear();
    let outcome =
        outcome.with_context(|| format!("Failed to start instance for account {}", account_id))?;

    match format {
        OutputFormat::Json => output_json(&outcome)?,
        OutputFormat::Pretty => match outcome {
            InstanceOutcome::AlreadyRunning { port } => println!(
                "{} Instance already running on port {}",
                style("•").cyan(),
                style(port).yellow()
            ),
            InstanceOutcome::Started { port } => println!(
                "{} Instance started on port {}",
                style("✓").green(),
                style(port).yellow()
            ),
            InstanceOutcome::Timeout => println!(
                "{} Instance did not become reachable in time; it may still be starting",
                style("!").yellow()
            ),
        },
    }

    if outcome == InstanceOutcome::Timeout {
        bail!("Timed out waiting for the instance of account {}", account_id);
    }
    Ok(())
}

/// Stop the account's instance, killing it when `force` is set and it hangs
pub async fn stop(
    orchestrator: &Orchestrator,
    account_id: Option<i64>,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let account_id = orchestrator.resolve_account(account_id).await?;

    let progress = spinner(format, format!("Stopping instance for account {}...", account_id));
    let outcome = orchestrator.stop_instance(account_id, force).await;
    progress.finish_and_clear();
    let outcome =
        outcome.with_context(|| format!("Failed to stop instance for account {}", account_id))?;

    match format {
        OutputFormat::Json => output_json(&outcome)?,
        OutputFormat::Pretty => match outcome {
            StopOutcome::Stopped => println!("{} Instance stopped", style("✓").green()),
            StopOutcome::Killed { processes } => println!(
                "{} Instance did not stop; killed {} process(es)",
                style("!").yellow(),
                processes
            ),
            StopOutcome::Timeout => println!(
                "{} Instance is still running{}",
                style("✗").red(),
                if force { "" } else { " (use --force to kill it)" }
            ),
        },
    }

    if outcome == StopOutcome::Timeout {
        bail!("Instance of account {} did not stop", account_id);
    }
    Ok(())
}

/// Report the instance processes behind the launcher
pub async fn status(orchestrator: &Orchestrator, format: OutputFormat) -> Result<()> {
    let launcher_port = orchestrator.launcher_endpoint().port();
    let instances = orchestrator.discover_instances().await;
    let connectable = instances.iter().find(|i| i.connectable).map(|i| i.cdp_port);

    match format {
        OutputFormat::Json => output_json(&json!({
            "launcherPort": launcher_port,
            "instancePort": connectable,
            "candidates": instances,
        })),
        OutputFormat::Pretty => {
            output_pretty(launcher_port, connectable, &instances);
            Ok(())
        }
    }
}

fn output_pretty(launcher_port: u16, connectable: Option<u16>, instances: &[DiscoveredInstance]) {
    println!("{}", style("Instance Status").bold().cyan());
    println!("  Launcher port: {}", launcher_port);
    match connectable {
        Some(port) => println!("  Instance port: {}", style(port).green()),
        None => println!("  Instance port: {}", style("not running").dim()),
    }

    if instances.is_empty() {
        return;
    }

    println!("\n{}", style("Candidates").bold());
    for instance in instances {
        let verdict = if instance.connectable {
            style("cdp").green()
        } else {
            style("no handshake").dim()
        };
        println!(
            "  pid {:>7}  port {:>5}  {}",
            instance.pid, instance.cdp_port, verdict
        );
    }
}
