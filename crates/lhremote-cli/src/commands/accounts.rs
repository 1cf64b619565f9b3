use super::output_json;
use crate::OutputFormat;
use anyhow::Result;
use console::style;
use lhremote_core::Orchestrator;
use lhremote_core::model::Account;

/// List the accounts configured in the launcher
pub async fn execute(orchestrator: &Orchestrator, format: OutputFormat) -> Result<()> {
    tracing::debug!("Listing accounts via {}", orchestrator.launcher_endpoint());
    let accounts = orchestrator
        .with_launcher(|launcher| launcher.list_accounts())
        .await?;

    match format {
        OutputFormat::Json => output_json(&accounts),
        OutputFormat::Pretty => {
            output_pretty(&accounts);
            Ok(())
        }
    }
}

fn output_pretty(accounts: &[Account]) {
    if accounts.is_empty() {
        println!("No accounts configured in the launcher.");
        return;
    }

    println!("{}", style("Accounts").bold().cyan());
    for account in accounts {
        let email = account
            .email
            .as_deref()
            .map(|email| format!(" <{}>", email))
            .unwrap_or_default();
        println!(
            "  {:>6}  {}{}",
            style(account.id).yellow(),
            account.name,
            style(email).dim()
        );
    }
}
