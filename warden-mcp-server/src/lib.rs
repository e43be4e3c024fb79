//! The sandboxed tool server: three cooperating tasks connected by bounded
//! channels, the way the MCP transport this protocol is modeled on is
//! usually wired — a stdin reader, a request processor, and a stdout
//! writer — adapted here to the line-delimited `Request`/`Response` shape
//! in [`transport`] instead of a full JSON-RPC envelope.

mod registry;
mod transport;

use std::io::Result as IoResult;

use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use warden_core::tools::ToolContext;

pub use transport::{Request, Response};

/// Size of the bounded channels connecting the three tasks. Generous for an
/// interactive, single-client process.
const CHANNEL_CAPACITY: usize = 128;

pub async fn run_main(ctx: ToolContext) -> IoResult<()> {
    let (incoming_tx, mut incoming_rx) = mpsc::channel::<Request>(CHANNEL_CAPACITY);
    let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Response>(CHANNEL_CAPACITY);

    let stdin_reader_handle = tokio::spawn({
        let incoming_tx = incoming_tx.clone();
        async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            while let Some(line) = lines.next_line().await.unwrap_or_default() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Request>(line) {
                    Ok(request) => {
                        if incoming_tx.send(request).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("failed to deserialize request: {e}"),
                }
            }

            debug!("stdin reader finished (EOF)");
        }
    });

    let processor_handle = tokio::spawn({
        let outgoing_tx = outgoing_tx.clone();
        async move {
            while let Some(request) = incoming_rx.recv().await {
                let response = handle_request(&ctx, request).await;
                if outgoing_tx.send(response).await.is_err() {
                    break;
                }
            }
            info!("processor task exited (channel closed)");
        }
    });

    let stdout_writer_handle = tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(response) = outgoing_rx.recv().await {
            match serde_json::to_string(&response) {
                Ok(json) => {
                    if let Err(e) = stdout.write_all(json.as_bytes()).await {
                        error!("failed to write response: {e}");
                        break;
                    }
                    if let Err(e) = stdout.write_all(b"\n").await {
                        error!("failed to write newline: {e}");
                        break;
                    }
                    if let Err(e) = stdout.flush().await {
                        error!("failed to flush stdout: {e}");
                        break;
                    }
                }
                Err(e) => error!("failed to serialize response: {e}"),
            }
        }
        info!("stdout writer exited (channel closed)");
    });

    let _ = tokio::join!(stdin_reader_handle, processor_handle, stdout_writer_handle);
    Ok(())
}

/// Dispatch one request. A handler error becomes an error response on the
/// wire; it never tears down the transport.
async fn handle_request(ctx: &ToolContext, request: Request) -> Response {
    match request {
        Request::ListTools { id } => Response::tools(id, registry::catalogue()),
        Request::CallTool { id, name, arguments } => match registry::dispatch(ctx, &name, arguments).await {
            Ok(response) => Response::tool_result(id, response.content, response.structured_content),
            Err(e) => Response::error(id, e.to_string()),
        },
    }
}
