//! Starting and stopping account instances through the launcher.

use crate::Result;
use crate::discovery::InstanceLocator;
use crate::model::{InstanceOutcome, StopOutcome};
use crate::poll::{PollTiming, poll_for};
use crate::services::LauncherApi;
use std::time::Duration;

/// Polling bounds for instance start and shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleTiming {
    pub start: PollTiming,
    pub shutdown: PollTiming,
}

impl Default for LifecycleTiming {
    fn default() -> Self {
        Self {
            start: PollTiming::new(Duration::from_secs(1), Duration::from_secs(45)),
            shutdown: PollTiming::new(Duration::from_secs(1), Duration::from_secs(30)),
        }
    }
}

/// Start the instance for `account_id` unless one is already reachable.
///
/// A start that does not produce a connectable port in time is reported as
/// [`InstanceOutcome::Timeout`], not as an error.
pub async fn start_instance_with_recovery(
    launcher: &dyn LauncherApi,
    locator: &dyn InstanceLocator,
    account_id: i64,
    launcher_port: u16,
    timing: &LifecycleTiming,
) -> Result<InstanceOutcome> {
    if let Some(port) = locator.discover_instance_port(launcher_port).await {
        tracing::info!(account_id, port, "Instance already running");
        return Ok(InstanceOutcome::AlreadyRunning { port });
    }

    launcher.start_instance(account_id).await?;

    match wait_for_instance_port(locator, launcher_port, timing.start).await {
        Some(port) => {
            tracing::info!(account_id, port, "Instance started");
            Ok(InstanceOutcome::Started { port })
        }
        None => {
            tracing::warn!(
                account_id,
                timeout_secs = timing.start.timeout.as_secs(),
                "Instance did not expose a debug port in time"
            );
            Ok(InstanceOutcome::Timeout)
        }
    }
}

/// Poll discovery until the instance's debug port shows up
pub async fn wait_for_instance_port(
    locator: &dyn InstanceLocator,
    launcher_port: u16,
    timing: PollTiming,
) -> Option<u16> {
    poll_for(timing, move || async move {
        let port = locator.discover_instance_port(launcher_port).await;
        if port.is_none() {
            tracing::debug!(launcher_port, "Instance port not available yet");
        }
        port
    })
    .await
}

/// Poll discovery until no instance answers. Returns `false` on timeout.
pub async fn wait_for_instance_shutdown(
    locator: &dyn InstanceLocator,
    launcher_port: u16,
    timing: PollTiming,
) -> bool {
    poll_for(timing, move || async move {
        match locator.discover_instance_port(launcher_port).await {
            Some(port) => {
                tracing::debug!(port, "Instance still answering");
                None
            }
            None => Some(()),
        }
    })
    .await
    .is_some()
}

/// Ask the launcher to stop the instance and wait until it is gone.
///
/// With `force`, an instance that outlives the shutdown wait has its
/// processes killed and is waited on once more.
pub async fn stop_instance(
    launcher: &dyn LauncherApi,
    locator: &dyn InstanceLocator,
    account_id: i64,
    launcher_port: u16,
    force: bool,
    timing: &LifecycleTiming,
) -> Result<StopOutcome> {
    launcher.stop_instance(account_id).await?;

    if wait_for_instance_shutdown(locator, launcher_port, timing.shutdown).await {
        tracing::info!(account_id, "Instance stopped");
        return Ok(StopOutcome::Stopped);
    }

    if !force {
        tracing::warn!(account_id, "Instance still running after stop request");
        return Ok(StopOutcome::Timeout);
    }

    let processes = locator.kill_instance_processes(launcher_port).await;
    tracing::warn!(account_id, processes, "Killed unresponsive instance");

    if wait_for_instance_shutdown(locator, launcher_port, timing.shutdown).await {
        Ok(StopOutcome::Killed { processes })
    } else {
        Ok(StopOutcome::Timeout)
    }
}
