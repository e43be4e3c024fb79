//! Interactive entry point: spawns the sandboxed tool server as a child
//! process, connects an agent loop to it and to a local model backend, and
//! runs a read-eval-print loop against stdin/stdout.

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use warden_agent::{AgentLoop, AgentLoopConfig, ConnectedServer, ModelClient};

const TERMINAL_SERVER_NAME: &str = "terminal-server";

/// Warden terminal agent.
#[derive(Debug, Parser)]
#[clap(author, version)]
struct Cli {
    /// Path to the JSON policy file the tool server loads.
    #[arg(long)]
    policy: PathBuf,

    /// Path to the `warden-mcp-server` binary. Defaults to a binary of that
    /// name next to this executable, matching how a cargo workspace's
    /// binaries are laid out side by side in one target directory.
    #[arg(long)]
    server_path: Option<PathBuf>,

    /// Base URL of the local language-model backend.
    #[arg(long, default_value = "http://localhost:11434")]
    model_url: String,

    /// Model name to request from the backend.
    #[arg(long, default_value = "llama3")]
    model: String,

    /// Maximum tool-call steps per user turn before giving up.
    #[arg(long, default_value_t = 6)]
    max_steps: usize,
}

fn default_server_path() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow::anyhow!("executable has no parent directory"))?;
    let name = if cfg!(windows) { "warden-mcp-server.exe" } else { "warden-mcp-server" };
    Ok(dir.join(name))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let server_path = match cli.server_path {
        Some(path) => path,
        None => default_server_path()?,
    };

    let server = ConnectedServer::connect(
        TERMINAL_SERVER_NAME,
        server_path.to_string_lossy().as_ref(),
        &["--policy".to_string(), cli.policy.to_string_lossy().into_owned()],
    )
    .await
    .map_err(|e| anyhow::anyhow!("connecting to the tool server: {e}"))?;

    let model = ModelClient::new(cli.model_url, cli.model);
    let config = AgentLoopConfig { max_steps: cli.max_steps, terminal_server_name: TERMINAL_SERVER_NAME.to_string() };
    let mut agent = AgentLoop::with_config(model, vec![server], config);

    run_repl(&mut agent).await
}

async fn run_repl(agent: &mut AgentLoop) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let reply = agent.handle_user_message(line).await;
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
