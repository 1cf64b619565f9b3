use crate::{Endpoint, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the debug-list endpoint exposed by every CDP process
pub const TARGET_LIST_PATH: &str = "/json/list";

/// Default timeout for a single `/json/list` request
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// An attachable page or context inside a CDP process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: String,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Absent while another client holds the debugger attachment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_socket_debugger_url: Option<String>,
}

impl Target {
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }

    /// Whether a new debugger session can attach to this target
    pub fn is_available(&self) -> bool {
        self.web_socket_debugger_url.is_some()
    }
}

/// List targets of the process behind `endpoint`
pub async fn discover_targets(endpoint: &Endpoint) -> Result<Vec<Target>> {
    discover_targets_with_timeout(endpoint, DEFAULT_DISCOVERY_TIMEOUT).await
}

/// List targets with an explicit request timeout.
///
/// Any failure (nothing listening, HTTP error, body that is not a JSON array of
/// targets) is reported as [`Error::Discovery`].
pub async fn discover_targets_with_timeout(
    endpoint: &Endpoint,
    timeout: Duration,
) -> Result<Vec<Target>> {
    let url = format!("{}{}", endpoint.http_url(), TARGET_LIST_PATH);
    let discovery_error = |reason: String| Error::Discovery {
        port: endpoint.port(),
        reason,
    };

    tracing::debug!("Listing CDP targets at {}", url);

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| discovery_error(e.to_string()))?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| discovery_error(format!("request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(discovery_error(format!("unexpected HTTP status {}", status)));
    }

    let body = response
        .text()
        .await
        .map_err(|e| discovery_error(format!("failed to read body: {}", e)))?;

    parse_target_list(&body).map_err(discovery_error)
}

fn parse_target_list(body: &str) -> std::result::Result<Vec<Target>, String> {
    serde_json::from_str::<Vec<Target>>(body)
        .map_err(|e| format!("response is not a target list: {}", e))
}

/// Loopback HTTP stubs for tests that need a target-list endpoint
#[cfg(any(test, feature = "test-util"))]
pub mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `body` with the given status line to every HTTP request on a
    /// fresh loopback port
    pub async fn serve(status: &'static str, body: String) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let body = body.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let mut request = Vec::new();
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        port
    }

    /// A loopback port with nothing listening on it
    pub async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }
}
