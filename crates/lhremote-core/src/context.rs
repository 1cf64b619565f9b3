//! Scoped acquisition of connections and database handles.
//!
//! Each function acquires its resources, hands borrowed access to a callback
//! and releases everything exactly once after the callback's future has
//! finished, whatever it returned.

use crate::db::{AccessMode, DatabaseProvider};
use crate::discovery::InstanceLocator;
use crate::services::{Connector, InstanceApi, LauncherApi};
use crate::{Error, Result};
use futures::future::BoxFuture;
use lhremote_cdp::Endpoint;

/// An open account database
pub struct DatabaseContext<'a, D> {
    pub account_id: i64,
    pub db: &'a mut D,
}

/// A connected instance plus its account database
pub struct InstanceDatabaseContext<'a, D> {
    pub account_id: i64,
    pub instance: &'a dyn InstanceApi,
    pub db: &'a mut D,
}

impl<'a, D> InstanceDatabaseContext<'a, D> {
    /// Database-only view for operations that do not talk to the instance
    pub fn database(&mut self) -> DatabaseContext<'_, D> {
        DatabaseContext {
            account_id: self.account_id,
            db: &mut *self.db,
        }
    }
}

/// Run `f` against a connected launcher, disconnecting afterwards
pub async fn with_launcher<T, F>(connector: &dyn Connector, endpoint: &Endpoint, f: F) -> Result<T>
where
    F: for<'c> FnOnce(&'c dyn LauncherApi) -> BoxFuture<'c, Result<T>>,
{
    let mut launcher = connector.connect_launcher(endpoint).await?;
    let result = f(launcher.as_ref()).await;
    launcher.disconnect().await;
    result
}

/// Run `f` against the account database, closing it afterwards
pub async fn with_database<P, T, F>(
    provider: &P,
    account_id: i64,
    mode: AccessMode,
    f: F,
) -> Result<T>
where
    P: DatabaseProvider,
    F: for<'c> FnOnce(DatabaseContext<'c, P::Handle>) -> BoxFuture<'c, Result<T>>,
{
    let mut db = provider.open(account_id, mode)?;
    let result = f(DatabaseContext {
        account_id,
        db: &mut db,
    })
    .await;
    provider.close(db);
    result
}

/// Run `f` against the running instance and its account database.
///
/// Fails with [`Error::InstanceNotRunning`] before anything is acquired when
/// no instance answers. The instance is connected before the database is
/// opened; a failed open still disconnects the instance.
pub async fn with_instance_database<P, T, F>(
    locator: &dyn InstanceLocator,
    connector: &dyn Connector,
    provider: &P,
    launcher: &Endpoint,
    account_id: i64,
    mode: AccessMode,
    f: F,
) -> Result<T>
where
    P: DatabaseProvider,
    F: for<'c> FnOnce(InstanceDatabaseContext<'c, P::Handle>) -> BoxFuture<'c, Result<T>>,
{
    let Some(port) = locator.discover_instance_port(launcher.port()).await else {
        return Err(Error::InstanceNotRunning { account_id });
    };

    let mut instance = connector.connect_instance(&launcher.with_port(port)).await?;

    let mut db = match provider.open(account_id, mode) {
        Ok(db) => db,
        Err(e) => {
            instance.disconnect().await;
            return Err(e);
        }
    };

    let result = f(InstanceDatabaseContext {
        account_id,
        instance: instance.as_ref(),
        db: &mut db,
    })
    .await;

    provider.close(db);
    instance.disconnect().await;
    result
}
