use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use warden_core::tools::ToolContext;
use warden_core::{AuditSink, ConfirmationStore, Policy};

/// Sandboxed tool server, speaking the line-delimited protocol over stdio.
#[derive(Debug, Parser)]
struct Cli {
    /// Path to the JSON policy file.
    #[arg(long)]
    policy: PathBuf,

    /// Working directory relative paths in the policy file resolve against.
    /// Defaults to the process's current directory.
    #[arg(long)]
    cwd: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let cwd = match cli.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir()?,
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli.policy, cwd))
}

async fn async_main(policy_path: PathBuf, cwd: PathBuf) -> anyhow::Result<()> {
    let policy = Policy::load(&policy_path, &cwd)?;
    let audit = AuditSink::open(&policy.audit_log_path).await?;
    let confirmations = ConfirmationStore::new(policy.confirm_ttl_seconds);

    let ctx = ToolContext::new(Arc::new(policy), Arc::new(audit), Arc::new(confirmations));

    warden_mcp_server::run_main(ctx).await?;
    Ok(())
}
