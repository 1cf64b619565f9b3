use super::output_json;
use crate::OutputFormat;
use anyhow::{Result, bail};
use console::style;
use lhremote_core::Orchestrator;

/// Run the launcher's UI health check for one account
pub async fn execute(
    orchestrator: &Orchestrator,
    account_id: Option<i64>,
    format: OutputFormat,
) -> Result<()> {
    let account_id = orchestrator.resolve_account(account_id).await?;
    let health = orchestrator
        .with_launcher(move |launcher| launcher.check_ui_health(account_id))
        .await?;

    match format {
        OutputFormat::Json => output_json(&health)?,
        OutputFormat::Pretty => {
            if health.healthy {
                println!("{} Account {} UI is healthy", style("✓").green(), account_id);
            } else {
                println!("{} Account {} UI has issues:", style("✗").red(), account_id);
                for issue in &health.issues {
                    println!("  - {}", issue);
                }
            }
        }
    }

    if !health.healthy {
        bail!("UI health check failed for account {}", account_id);
    }
    Ok(())
}
