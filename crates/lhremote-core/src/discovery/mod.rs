//! Finding the instance process spawned by the launcher.
//!
//! The launcher listens on a well-known debug port; each account instance is
//! a direct child process that listens on a port chosen at startup. Only a
//! successful CDP handshake marks a port as the instance's debug port.

mod probe;
mod system;

pub use probe::HttpHandshakeProbe;
pub use system::SystemProcessInspector;

use crate::Result;
use crate::model::DiscoveredInstance;
use crate::poll::first_success;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeSet;
use std::sync::Arc;

/// OS-level process and socket queries
#[async_trait]
pub trait ProcessInspector: Send + Sync {
    /// Pid of the process listening on `port`, if any
    async fn listening_pid(&self, port: u16) -> Result<Option<u32>>;

    /// Direct children of `parent_pid`
    async fn child_pids(&self, parent_pid: u32) -> Result<Vec<u32>>;

    /// TCP ports `pid` is listening on
    async fn listening_ports(&self, pid: u32) -> Result<Vec<u16>>;

    /// Force-terminate `pid`. A process that is already gone is not an error.
    async fn kill(&self, pid: u32) -> Result<()>;
}

/// Confirms that a port speaks CDP
#[async_trait]
pub trait HandshakeProbe: Send + Sync {
    async fn probe(&self, port: u16) -> bool;
}

/// Locates the instance belonging to a launcher
#[async_trait]
pub trait InstanceLocator: Send + Sync {
    /// Debug port of the running instance, or `None` when nothing answers
    async fn discover_instance_port(&self, launcher_port: u16) -> Option<u16>;

    /// Every candidate port of every child with its handshake result
    async fn discover_instances(&self, launcher_port: u16) -> Vec<DiscoveredInstance>;

    /// Kill every child of the launcher. Returns how many were killed.
    async fn kill_instance_processes(&self, launcher_port: u16) -> usize;
}

/// [`InstanceLocator`] built on process inspection plus handshake probes
#[derive(Clone)]
pub struct PortDiscovery {
    inspector: Arc<dyn ProcessInspector>,
    probe: Arc<dyn HandshakeProbe>,
}

impl PortDiscovery {
    pub fn new(inspector: Arc<dyn ProcessInspector>, probe: Arc<dyn HandshakeProbe>) -> Self {
        Self { inspector, probe }
    }

    /// Children of the process listening on `launcher_port`.
    ///
    /// `None` when no launcher process could be resolved.
    async fn launcher_children(&self, launcher_port: u16) -> Option<Vec<u32>> {
        let launcher_pid = match self.inspector.listening_pid(launcher_port).await {
            Ok(Some(pid)) => pid,
            Ok(None) => {
                tracing::debug!(launcher_port, "No process listening on launcher port");
                return None;
            }
            Err(e) => {
                tracing::debug!(launcher_port, "Launcher pid lookup failed: {}", e);
                return None;
            }
        };

        match self.inspector.child_pids(launcher_pid).await {
            Ok(children) => {
                tracing::debug!(launcher_pid, ?children, "Launcher children");
                Some(children)
            }
            Err(e) => {
                tracing::debug!(launcher_pid, "Process enumeration failed: {}", e);
                None
            }
        }
    }

    /// `(pid, port)` pairs of every child listening port except the launcher's
    async fn candidate_ports(&self, launcher_port: u16) -> Vec<(u32, u16)> {
        let Some(children) = self.launcher_children(launcher_port).await else {
            return Vec::new();
        };

        let per_child = join_all(children.into_iter().map(|pid| async move {
            match self.inspector.listening_ports(pid).await {
                Ok(ports) => (pid, ports),
                Err(e) => {
                    tracing::debug!(pid, "Port lookup failed: {}", e);
                    (pid, Vec::new())
                }
            }
        }))
        .await;

        let mut seen = BTreeSet::new();
        let mut candidates = Vec::new();
        for (pid, ports) in per_child {
            for port in ports {
                if port != launcher_port && seen.insert(port) {
                    candidates.push((pid, port));
                }
            }
        }
        candidates
    }
}

#[async_trait]
impl InstanceLocator for PortDiscovery {
    async fn discover_instance_port(&self, launcher_port: u16) -> Option<u16> {
        let candidates = self.candidate_ports(launcher_port).await;
        if candidates.is_empty() {
            return None;
        }

        let probes = candidates.into_iter().map(|(_, port)| {
            let probe = self.probe.clone();
            async move { probe.probe(port).await.then_some(port) }
        });

        let found = first_success(probes).await;
        match found {
            Some(port) => tracing::debug!(launcher_port, port, "Instance port discovered"),
            None => tracing::debug!(launcher_port, "No candidate port passed the handshake"),
        }
        found
    }

    async fn discover_instances(&self, launcher_port: u16) -> Vec<DiscoveredInstance> {
        let candidates = self.candidate_ports(launcher_port).await;
        join_all(candidates.into_iter().map(|(pid, port)| async move {
            DiscoveredInstance {
                pid,
                cdp_port: port,
                connectable: self.probe.probe(port).await,
            }
        }))
        .await
    }

    async fn kill_instance_processes(&self, launcher_port: u16) -> usize {
        let Some(children) = self.launcher_children(launcher_port).await else {
            return 0;
        };

        let mut killed = 0;
        for pid in children {
            match self.inspector.kill(pid).await {
                Ok(()) => {
                    tracing::info!(pid, "Killed instance process");
                    killed += 1;
                }
                Err(e) => tracing::warn!(pid, "Failed to kill instance process: {}", e),
            }
        }
        killed
    }
}
