//! The client side of the line-delimited JSON transport `warden-mcp-server`
//! speaks: spawn the tool server as a child process, pipe its stdio, and
//! correlate responses to requests by `id`, one client per configured
//! server, the way a connection manager aggregates tools across several
//! independently-spawned servers.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex};

use warden_protocol::{ToolInfo, WardenError};

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum WireRequest {
    ListTools { id: String },
    CallTool { id: String, name: String, arguments: Value },
}

#[derive(Debug, Clone, serde::Deserialize)]
struct WireResponse {
    id: String,
    ok: bool,
    #[serde(default)]
    tools: Option<Vec<ToolInfo>>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default, rename = "structuredContent")]
    structured_content: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<WireResponse>>>>;

/// A spawned tool server process with request/response correlation. The
/// reader task lives for as long as the child's stdout stays open; a
/// dropped `StdioToolClient` drops its stdin handle, which normally causes
/// the child to observe EOF and exit on its own.
pub struct StdioToolClient {
    child: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    pending: PendingMap,
    next_id: AtomicU64,
    reader_task: tokio::task::JoinHandle<()>,
}

impl StdioToolClient {
    /// Spawn `program` with `args`, wiring its stdin/stdout as pipes. The
    /// process is never run through a shell, matching the Process Runner's
    /// own spawning discipline.
    pub async fn spawn(program: &str, args: &[String]) -> Result<Self, WardenError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WardenError::SpawnFailure(format!("{program}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| WardenError::SpawnFailure("child has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WardenError::SpawnFailure("child has no stdout".to_string()))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = tokio::spawn(read_responses(stdout, pending.clone()));

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            reader_task,
        })
    }

    fn fresh_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }

    async fn roundtrip(&self, request: WireRequest, id: String) -> Result<WireResponse, WardenError> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let mut line = serde_json::to_string(&request)
            .map_err(|e| WardenError::ActionInvalid(format!("encoding request: {e}")))?;
        line.push('\n');

        {
            let mut stdin = self.stdin.lock().await;
            stdin
                .write_all(line.as_bytes())
                .await
                .map_err(WardenError::IoFailure)?;
            stdin.flush().await.map_err(WardenError::IoFailure)?;
        }

        rx.await.map_err(|_| {
            WardenError::ModelUnavailable("tool server closed the connection".to_string())
        })
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>, WardenError> {
        let id = self.fresh_id();
        let response = self.roundtrip(WireRequest::ListTools { id: id.clone() }, id).await?;
        if !response.ok {
            return Err(WardenError::ModelUnavailable(
                response.error.unwrap_or_else(|| "list_tools failed".to_string()),
            ));
        }
        Ok(response.tools.unwrap_or_default())
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<(Value, Option<Value>), WardenError> {
        let id = self.fresh_id();
        let response = self
            .roundtrip(
                WireRequest::CallTool { id: id.clone(), name: name.to_string(), arguments },
                id,
            )
            .await?;
        if !response.ok {
            return Err(WardenError::ActionInvalid(
                response.error.unwrap_or_else(|| format!("call to '{name}' failed")),
            ));
        }
        Ok((response.content.unwrap_or(Value::Null), response.structured_content))
    }
}

impl Drop for StdioToolClient {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}

async fn read_responses(stdout: tokio::process::ChildStdout, pending: PendingMap) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<WireResponse>(line) {
                    Ok(response) => {
                        if let Some(tx) = pending.lock().await.remove(&response.id) {
                            let _ = tx.send(response);
                        }
                    }
                    Err(e) => tracing::warn!("malformed response line from tool server: {e}"),
                }
            }
            Ok(None) => {
                tracing::debug!("tool server closed stdout");
                break;
            }
            Err(e) => {
                tracing::warn!("error reading tool server stdout: {e}");
                break;
            }
        }
    }
}

/// `{name, tools, transport-handle}` — a single server the agent loop can
/// dispatch to, keyed by the human-readable `name` used in `Action::Tool`.
pub struct ConnectedServer {
    pub name: String,
    pub tools: Vec<ToolInfo>,
    client: Option<Arc<StdioToolClient>>,
}

impl ConnectedServer {
    pub async fn connect(name: impl Into<String>, program: &str, args: &[String]) -> Result<Self, WardenError> {
        let client = StdioToolClient::spawn(program, args).await?;
        let tools = client.list_tools().await?;
        Ok(Self { name: name.into(), tools, client: Some(Arc::new(client)) })
    }

    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<(Value, Option<Value>), WardenError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| WardenError::ActionInvalid("server has no live transport".to_string()))?;
        client.call_tool(tool, arguments).await
    }

    /// A transport-less fixture for rendering and dedup tests that never
    /// dispatch a call.
    #[cfg(test)]
    pub fn stub(name: impl Into<String>, tools: Vec<ToolInfo>) -> Self {
        Self { name: name.into(), tools, client: None }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn stub_server_has_no_client() {
        let server = ConnectedServer::stub("terminal-server", vec![]);
        assert_eq!(server.name, "terminal-server");
        assert!(server.tools.is_empty());
    }
}
