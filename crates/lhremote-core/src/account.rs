use crate::context::with_launcher;
use crate::error::AccountResolutionReason;
use crate::services::Connector;
use crate::{Error, Result};
use lhremote_cdp::Endpoint;

/// Pick the account to operate on when none was given.
///
/// Succeeds only when the launcher manages exactly one account.
pub async fn resolve_account(connector: &dyn Connector, launcher: &Endpoint) -> Result<i64> {
    let accounts = with_launcher(connector, launcher, |launcher| launcher.list_accounts()).await?;

    match accounts.as_slice() {
        [account] => {
            tracing::debug!(account_id = account.id, name = %account.name, "Resolved account");
            Ok(account.id)
        }
        [] => Err(Error::AccountResolution {
            reason: AccountResolutionReason::NoAccounts,
        }),
        many => Err(Error::AccountResolution {
            reason: AccountResolutionReason::MultipleAccounts { count: many.len() },
        }),
    }
}
