use crate::targets::discover_targets;
use crate::{Endpoint, Error, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Default timeout for a single CDP call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

type PendingCalls = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// Error object of a failed CDP call
#[derive(Debug, Clone, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Incoming frame. Responses carry `id`, events carry `method`.
#[derive(Debug, Deserialize)]
struct Response {
    id: Option<u64>,
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Live transport state. Present only while the session is open.
struct Connection {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: PendingCalls,
    /// Set by the reader once the socket is gone
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// A CDP session over one WebSocket.
///
/// Calls are multiplexed over the socket with increasing ids; a background
/// reader matches responses to waiting callers and drops everything else.
pub struct CdpSession {
    url: String,
    connection: Option<Connection>,
    next_id: AtomicU64,
    call_timeout: Duration,
}

impl CdpSession {
    /// Connect to the first attachable page target of the process behind
    /// `endpoint`
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let targets = discover_targets(endpoint)
            .await
            .map_err(|e| Error::connection(endpoint, e))?;

        let pages: Vec<_> = targets.iter().filter(|t| t.is_page()).collect();
        let ws_url = pages
            .iter()
            .find_map(|t| t.web_socket_debugger_url.clone())
            .ok_or_else(|| {
                if pages.is_empty() {
                    Error::connection(endpoint, "no page target found")
                } else {
                    Error::connection(
                        endpoint,
                        "page target is already attached to another debugger client",
                    )
                }
            })?;

        Self::connect_url(&ws_url).await
    }

    /// Connect directly to a target's WebSocket debugger URL
    pub async fn connect_url(ws_url: &str) -> Result<Self> {
        let parsed = url::Url::parse(ws_url)
            .map_err(|e| Error::connection(ws_url, format!("invalid WebSocket URL: {}", e)))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(Error::connection(
                ws_url,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        tracing::debug!("Opening CDP WebSocket {}", ws_url);

        let (stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| Error::connection(ws_url, e))?;
        let (mut sink, mut source) = stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let pending: PendingCalls = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    tracing::debug!("CDP write failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader_pending = pending.clone();
        let reader_closed = closed.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => dispatch(&reader_pending, &text).await,
                    Ok(Message::Close(_)) => {
                        tracing::debug!("CDP WebSocket closed by remote");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("CDP read failed: {}", e);
                        break;
                    }
                }
            }
            // Flag first so a call racing with the clear below cannot park
            // a waiter nobody will answer.
            reader_closed.store(true, Ordering::SeqCst);
            reader_pending.lock().await.clear();
        });

        Ok(Self {
            url: ws_url.to_string(),
            connection: Some(Connection {
                outgoing,
                pending,
                closed,
                reader,
                writer,
            }),
            next_id: AtomicU64::new(1),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        })
    }

    /// Override the default per-call timeout
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// False after `close` or once the remote has hung up
    pub fn is_open(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| !c.closed.load(Ordering::SeqCst))
    }

    /// Issue a CDP method call and wait for its result
    pub async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let connection = self
            .connection
            .as_ref()
            .ok_or_else(|| Error::connection(&self.url, "session is closed"))?;
        if connection.closed.load(Ordering::SeqCst) {
            return Err(Error::connection(&self.url, "connection closed by remote"));
        }
        let timeout = timeout.unwrap_or(self.call_timeout);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let frame = json!({ "id": id, "method": method, "params": params });

        let (tx, rx) = oneshot::channel();
        connection.pending.lock().await.insert(id, tx);
        if connection.closed.load(Ordering::SeqCst) {
            connection.pending.lock().await.remove(&id);
            return Err(Error::connection(&self.url, "connection closed by remote"));
        }

        if connection
            .outgoing
            .send(Message::Text(frame.to_string()))
            .is_err()
        {
            connection.pending.lock().await.remove(&id);
            return Err(Error::connection(&self.url, "transport is closed"));
        }

        tracing::trace!(id, method, "CDP call sent");

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => match response.error {
                Some(error) => Err(Error::Evaluation(format!(
                    "{} failed: {} (code {})",
                    method, error.message, error.code
                ))),
                None => Ok(response.result.unwrap_or(Value::Null)),
            },
            Ok(Err(_)) => Err(Error::connection(
                &self.url,
                "connection closed before response",
            )),
            Err(_) => {
                connection.pending.lock().await.remove(&id);
                Err(Error::Timeout {
                    method: method.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Evaluate a script expression in the target and return its value.
    ///
    /// Promises are awaited. A thrown exception becomes [`Error::Evaluation`].
    pub async fn evaluate(&self, expression: &str, timeout: Option<Duration>) -> Result<Value> {
        let result = self
            .call(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
                timeout,
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            return Err(Error::Evaluation(exception_message(details)));
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Close the session. Closing twice is a no-op.
    pub async fn close(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        tracing::debug!("Closing CDP session {}", self.url);

        // Writer exits after flushing the close frame or once the sender drops.
        let _ = connection.outgoing.send(Message::Close(None));
        drop(connection.outgoing);
        if tokio::time::timeout(Duration::from_secs(1), connection.writer)
            .await
            .is_err()
        {
            tracing::debug!("CDP writer did not finish in time");
        }
        connection.reader.abort();
        connection.pending.lock().await.clear();
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.reader.abort();
            connection.writer.abort();
        }
    }
}

async fn dispatch(pending: &PendingCalls, text: &str) {
    let response: Response = match serde_json::from_str(text) {
        Ok(response) => response,
        Err(e) => {
            tracing::trace!("Ignoring unparseable CDP frame: {}", e);
            return;
        }
    };

    match response.id {
        Some(id) => {
            let waiter = pending.lock().await.remove(&id);
            match waiter {
                Some(tx) => {
                    let _ = tx.send(response);
                }
                None => tracing::trace!(id, "Discarding unmatched CDP response"),
            }
        }
        None => {
            if let Some(method) = response.method.as_deref() {
                tracing::trace!(method, "Ignoring CDP event");
            }
        }
    }
}

fn exception_message(details: &Value) -> String {
    details
        .get("exception")
        .and_then(|e| e.get("description"))
        .and_then(Value::as_str)
        .or_else(|| details.get("text").and_then(Value::as_str))
        .unwrap_or("script threw an exception")
        .to_string()
}
