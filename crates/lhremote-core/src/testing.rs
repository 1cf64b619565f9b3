//! Test doubles shared by the module tests.

use crate::discovery::InstanceLocator;
use crate::model::{Account, ActionResult, DiscoveredInstance, RunnerState, UiHealth};
use crate::services::{Connector, InstanceApi, LauncherApi};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use lhremote_cdp::Endpoint;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Start a mock page that answers `Runtime.evaluate` with `handler`.
///
/// `Ok(value)` becomes the evaluation result; `Err(description)` becomes a
/// thrown exception. Returns the page's WebSocket URL.
pub async fn mock_page<F>(handler: F) -> String
where
    F: Fn(&str) -> std::result::Result<Value, String> + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let Ok(ws) = accept_async(stream).await else {
                    return;
                };
                let (mut sink, mut source) = ws.split();
                while let Some(Ok(message)) = source.next().await {
                    let Message::Text(text) = message else {
                        continue;
                    };
                    let call: Value = serde_json::from_str(&text).unwrap();
                    let id = call["id"].as_u64().unwrap();
                    let reply = if call["method"] == "Runtime.evaluate" {
                        let expression = call["params"]["expression"].as_str().unwrap_or_default();
                        match handler(expression) {
                            Ok(value) => json!({"id": id, "result": {"result": {"value": value}}}),
                            Err(description) => json!({
                                "id": id,
                                "result": {
                                    "result": {"type": "object", "subtype": "error"},
                                    "exceptionDetails": {
                                        "text": "Uncaught",
                                        "exception": {"description": description}
                                    }
                                }
                            }),
                        }
                    } else {
                        json!({"id": id, "result": {}})
                    };
                    if sink.send(Message::Text(reply.to_string())).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    format!("ws://127.0.0.1:{}/devtools/page/MOCK", port)
}

/// Scripted answers: each call takes the next one, the last one repeats
pub struct Script<T>(Mutex<VecDeque<T>>);

impl<T: Clone> Script<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let items: VecDeque<T> = items.into_iter().collect();
        assert!(!items.is_empty(), "a script needs at least one answer");
        Self(Mutex::new(items))
    }

    pub fn next(&self) -> T {
        let mut items = self.0.lock().unwrap();
        if items.len() > 1 {
            items.pop_front().unwrap()
        } else {
            items[0].clone()
        }
    }

    pub fn replace(&self, items: impl IntoIterator<Item = T>) {
        *self.0.lock().unwrap() = items.into_iter().collect();
    }
}

pub fn account(id: i64) -> Account {
    Account {
        id,
        external_id: 1000 + id,
        name: format!("Account {}", id),
        email: None,
    }
}

/// Calls observed by a [`FakeLauncher`]
#[derive(Default)]
pub struct LauncherLog {
    pub started: Mutex<Vec<i64>>,
    pub stopped: Mutex<Vec<i64>>,
    pub disconnects: AtomicUsize,
}

impl LauncherLog {
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct FakeLauncher {
    pub accounts: Vec<Account>,
    pub fail_listing: bool,
    pub log: Arc<LauncherLog>,
}

impl FakeLauncher {
    pub fn with_accounts(ids: &[i64]) -> Self {
        Self {
            accounts: ids.iter().copied().map(account).collect(),
            fail_listing: false,
            log: Arc::default(),
        }
    }
}

#[async_trait]
impl LauncherApi for FakeLauncher {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        if self.fail_listing {
            return Err(Error::Protocol {
                operation: "list-accounts".to_string(),
                reason: "invalid type: null".to_string(),
            });
        }
        Ok(self.accounts.clone())
    }

    async fn start_instance(&self, account_id: i64) -> Result<()> {
        self.log.started.lock().unwrap().push(account_id);
        Ok(())
    }

    async fn stop_instance(&self, account_id: i64) -> Result<()> {
        self.log.stopped.lock().unwrap().push(account_id);
        Ok(())
    }

    async fn check_ui_health(&self, _account_id: i64) -> Result<UiHealth> {
        Ok(UiHealth {
            healthy: true,
            issues: Vec::new(),
        })
    }

    async fn disconnect(&mut self) {
        self.log.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Calls observed by a [`FakeInstance`]
#[derive(Default)]
pub struct InstanceLog {
    pub actions: Mutex<Vec<(String, Value)>>,
    pub state_reads: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl InstanceLog {
    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn action_types(&self) -> Vec<String> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .map(|(action_type, _)| action_type.clone())
            .collect()
    }
}

#[derive(Clone)]
pub struct FakeInstance {
    pub states: Arc<Script<RunnerState>>,
    pub action_result: ActionResult,
    pub log: Arc<InstanceLog>,
}

impl FakeInstance {
    pub fn new(states: impl IntoIterator<Item = RunnerState>) -> Self {
        Self {
            states: Arc::new(Script::new(states)),
            action_result: ActionResult {
                success: true,
                message: None,
                data: Value::Null,
            },
            log: Arc::default(),
        }
    }

    pub fn rejecting(mut self, message: &str) -> Self {
        self.action_result = ActionResult {
            success: false,
            message: Some(message.to_string()),
            data: Value::Null,
        };
        self
    }
}

#[async_trait]
impl InstanceApi for FakeInstance {
    async fn execute_action(&self, action_type: &str, params: Value) -> Result<ActionResult> {
        self.log
            .actions
            .lock()
            .unwrap()
            .push((action_type.to_string(), params));
        Ok(self.action_result.clone())
    }

    async fn runner_state(&self) -> Result<RunnerState> {
        self.log.state_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.states.next())
    }

    async fn disconnect(&mut self) {
        self.log.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out clones of the configured fakes; `None` fails the connect
#[derive(Clone, Default)]
pub struct FakeConnector {
    pub launcher: Option<FakeLauncher>,
    pub instance: Option<FakeInstance>,
    pub instance_ports: Arc<Mutex<Vec<u16>>>,
}

fn refused(endpoint: &Endpoint) -> Error {
    Error::Cdp(lhremote_cdp::Error::Connection {
        endpoint: endpoint.to_string(),
        reason: "connection refused".to_string(),
    })
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect_launcher(&self, endpoint: &Endpoint) -> Result<Box<dyn LauncherApi>> {
        match &self.launcher {
            Some(launcher) => Ok(Box::new(launcher.clone())),
            None => Err(refused(endpoint)),
        }
    }

    async fn connect_instance(&self, endpoint: &Endpoint) -> Result<Box<dyn InstanceApi>> {
        self.instance_ports.lock().unwrap().push(endpoint.port());
        match &self.instance {
            Some(instance) => Ok(Box::new(instance.clone())),
            None => Err(refused(endpoint)),
        }
    }
}

/// Locator answering from a script of discovery results
pub struct FakeLocator {
    pub ports: Script<Option<u16>>,
    pub discoveries: AtomicUsize,
    pub kills: AtomicUsize,
    /// Processes a kill reports; killing makes the instance disappear
    pub killable: usize,
}

impl FakeLocator {
    pub fn new(ports: impl IntoIterator<Item = Option<u16>>) -> Self {
        Self {
            ports: Script::new(ports),
            discoveries: AtomicUsize::new(0),
            kills: AtomicUsize::new(0),
            killable: 0,
        }
    }

    pub fn running(port: u16) -> Self {
        Self::new([Some(port)])
    }

    pub fn discoveries(&self) -> usize {
        self.discoveries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstanceLocator for FakeLocator {
    async fn discover_instance_port(&self, _launcher_port: u16) -> Option<u16> {
        self.discoveries.fetch_add(1, Ordering::SeqCst);
        self.ports.next()
    }

    async fn discover_instances(&self, _launcher_port: u16) -> Vec<DiscoveredInstance> {
        self.ports
            .next()
            .map(|port| DiscoveredInstance {
                pid: 4242,
                cdp_port: port,
                connectable: true,
            })
            .into_iter()
            .collect()
    }

    async fn kill_instance_processes(&self, _launcher_port: u16) -> usize {
        self.kills.fetch_add(1, Ordering::SeqCst);
        if self.killable > 0 {
            self.ports.replace([None]);
        }
        self.killable
    }
}
