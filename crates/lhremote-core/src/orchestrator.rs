use crate::Result;
use crate::account::resolve_account;
use crate::campaign::{self, CampaignTiming};
use crate::context::{self, DatabaseContext, InstanceDatabaseContext};
use crate::db::{AccessMode, Database, DatabaseLocator, DatabaseProvider};
use crate::discovery::{
    HttpHandshakeProbe, InstanceLocator, PortDiscovery, SystemProcessInspector,
};
use crate::lifecycle::{self, LifecycleTiming};
use crate::model::{CampaignRunState, DiscoveredInstance, InstanceOutcome, RetryReport, StopOutcome};
use crate::services::{CdpConnector, Connector, LauncherApi};
use futures::future::BoxFuture;
use lhremote_cdp::Endpoint;
use std::path::PathBuf;
use std::sync::Arc;

/// Entry point tying discovery, service connections and account databases
/// to one launcher endpoint
pub struct Orchestrator<P: DatabaseProvider = DatabaseLocator> {
    launcher: Endpoint,
    locator: Arc<dyn InstanceLocator>,
    connector: Arc<dyn Connector>,
    databases: P,
    lifecycle: LifecycleTiming,
}

impl Orchestrator<DatabaseLocator> {
    /// Production wiring: OS process inspection, HTTP handshake probes and
    /// CDP-backed services
    pub fn new(launcher: Endpoint, data_dir: impl Into<PathBuf>) -> Self {
        let locator = PortDiscovery::new(
            Arc::new(SystemProcessInspector),
            Arc::new(HttpHandshakeProbe::new(launcher.clone())),
        );
        Self::with_parts(
            launcher,
            Arc::new(locator),
            Arc::new(CdpConnector::default()),
            DatabaseLocator::new(data_dir),
        )
    }
}

impl<P: DatabaseProvider> Orchestrator<P> {
    pub fn with_parts(
        launcher: Endpoint,
        locator: Arc<dyn InstanceLocator>,
        connector: Arc<dyn Connector>,
        databases: P,
    ) -> Self {
        Self {
            launcher,
            locator,
            connector,
            databases,
            lifecycle: LifecycleTiming::default(),
        }
    }

    pub fn launcher_endpoint(&self) -> &Endpoint {
        &self.launcher
    }

    pub async fn with_launcher<T, F>(&self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c dyn LauncherApi) -> BoxFuture<'c, Result<T>>,
    {
        context::with_launcher(self.connector.as_ref(), &self.launcher, f).await
    }

    pub async fn with_database<T, F>(&self, account_id: i64, mode: AccessMode, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(DatabaseContext<'c, P::Handle>) -> BoxFuture<'c, Result<T>>,
    {
        context::with_database(&self.databases, account_id, mode, f).await
    }

    pub async fn with_instance_database<T, F>(
        &self,
        account_id: i64,
        mode: AccessMode,
        f: F,
    ) -> Result<T>
    where
        F: for<'c> FnOnce(InstanceDatabaseContext<'c, P::Handle>) -> BoxFuture<'c, Result<T>>,
    {
        context::with_instance_database(
            self.locator.as_ref(),
            self.connector.as_ref(),
            &self.databases,
            &self.launcher,
            account_id,
            mode,
            f,
        )
        .await
    }

    /// The given account, or the launcher's only account
    pub async fn resolve_account(&self, account_id: Option<i64>) -> Result<i64> {
        match account_id {
            Some(id) => Ok(id),
            None => resolve_account(self.connector.as_ref(), &self.launcher).await,
        }
    }

    pub async fn discover_instances(&self) -> Vec<DiscoveredInstance> {
        self.locator.discover_instances(self.launcher.port()).await
    }

    pub async fn start_instance(&self, account_id: i64) -> Result<InstanceOutcome> {
        let locator = self.locator.clone();
        let launcher_port = self.launcher.port();
        let timing = self.lifecycle;
        self.with_launcher(move |launcher| {
            Box::pin(async move {
                lifecycle::start_instance_with_recovery(
                    launcher,
                    locator.as_ref(),
                    account_id,
                    launcher_port,
                    &timing,
                )
                .await
            })
        })
        .await
    }

    pub async fn stop_instance(&self, account_id: i64, force: bool) -> Result<StopOutcome> {
        let locator = self.locator.clone();
        let launcher_port = self.launcher.port();
        let timing = self.lifecycle;
        self.with_launcher(move |launcher| {
            Box::pin(async move {
                lifecycle::stop_instance(
                    launcher,
                    locator.as_ref(),
                    account_id,
                    launcher_port,
                    force,
                    &timing,
                )
                .await
            })
        })
        .await
    }
}

/// Campaign operations, each opening the account database with the access
/// it needs
impl<P: DatabaseProvider<Handle = Database>> Orchestrator<P> {
    pub async fn start_campaign(
        &self,
        account_id: i64,
        campaign_id: i64,
        person_ids: Vec<i64>,
        timing: CampaignTiming,
    ) -> Result<()> {
        self.with_instance_database(account_id, AccessMode::ReadWrite, move |mut ctx| {
            Box::pin(async move { campaign::start(&mut ctx, campaign_id, &person_ids, &timing).await })
        })
        .await
    }

    pub async fn stop_campaign(
        &self,
        account_id: i64,
        campaign_id: i64,
        timing: CampaignTiming,
    ) -> Result<()> {
        self.with_instance_database(account_id, AccessMode::ReadOnly, move |mut ctx| {
            Box::pin(async move { campaign::stop(&mut ctx, campaign_id, &timing).await })
        })
        .await
    }

    pub async fn retry_campaign(
        &self,
        account_id: i64,
        campaign_id: i64,
        person_ids: Vec<i64>,
    ) -> Result<RetryReport> {
        self.with_database(account_id, AccessMode::ReadWrite, move |mut ctx| {
            Box::pin(async move { campaign::retry(&mut ctx, campaign_id, &person_ids) })
        })
        .await
    }

    pub async fn campaign_status(
        &self,
        account_id: i64,
        campaign_id: i64,
    ) -> Result<CampaignRunState> {
        self.with_instance_database(account_id, AccessMode::ReadOnly, move |mut ctx| {
            Box::pin(async move { campaign::status(&mut ctx, campaign_id).await })
        })
        .await
    }
}
