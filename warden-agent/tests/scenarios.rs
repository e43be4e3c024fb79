//! End-to-end scenarios that drive the agent loop against a real, spawned
//! tool server process (not a stub), exercised as a genuine child process
//! rather than mocked out.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use warden_agent::{AgentLoop, AgentLoopConfig, ConnectedServer, ModelClient};

const TERMINAL_SERVER_NAME: &str = "terminal-server";

/// Cargo places every workspace binary in one profile directory alongside
/// this test binary's grandparent (`target/<profile>/deps/<this test>` ->
/// `target/<profile>/warden-mcp-server`).
fn server_binary_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let deps_dir = exe.parent()?;
    let profile_dir = deps_dir.parent()?;
    let name = if cfg!(windows) { "warden-mcp-server.exe" } else { "warden-mcp-server" };
    let candidate = profile_dir.join(name);
    candidate.exists().then_some(candidate)
}

fn write_policy(dir: &Path, allowed_commands: &[&str]) -> PathBuf {
    let sandbox_root = dir.join("sandbox");
    std::fs::create_dir_all(&sandbox_root).expect("mkdir sandbox");
    let policy = json!({
        "sandboxRoot": sandbox_root.display().to_string(),
        "auditLogPath": "audit.log",
        "allowedCommands": allowed_commands,
        "confirmTtlSeconds": 90,
    });
    let policy_path = dir.join("policy.json");
    std::fs::write(&policy_path, serde_json::to_vec_pretty(&policy).expect("serialize policy"))
        .expect("write policy");
    policy_path
}

async fn connect_terminal_server(policy_path: &Path) -> ConnectedServer {
    let program = server_binary_path()
        .expect("warden-mcp-server binary not found next to the test binary; build the workspace first");
    ConnectedServer::connect(
        TERMINAL_SERVER_NAME,
        program.to_string_lossy().as_ref(),
        &["--policy".to_string(), policy_path.to_string_lossy().into_owned()],
    )
    .await
    .expect("connect to tool server")
}

#[tokio::test]
async fn s5_ssh_key_wizard_falls_through_to_a_confirmation() {
    let tmp = tempfile::tempdir().expect("tempdir");
    std::env::set_var("HOME", tmp.path());
    let policy_path = write_policy(tmp.path(), &["ssh-keygen"]);
    let server = connect_terminal_server(&policy_path).await;

    // The model is never consulted for this turn; point it at a server
    // that would fail any request, to prove the wizard gate short-circuits
    // before any model call.
    let model = ModelClient::new("http://127.0.0.1:1", "unused-model");
    let mut agent = AgentLoop::new(model, vec![server]);

    let first = agent.handle_user_message("can you create an ssh key for me?").await;
    assert!(first.contains("use defaults"), "wizard prompt offers a defaults shortcut: {first}");

    let second = agent.handle_user_message("use defaults").await;
    assert!(second.contains("requires confirmation"), "generate_ssh_key response: {second}");
    assert!(second.contains("Call confirm with token"), "response: {second}");
}

#[tokio::test]
async fn s6_repeated_identical_tool_call_is_deduplicated() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let policy_path = write_policy(tmp.path(), &["echo"]);
    let server = connect_terminal_server(&policy_path).await;

    let model_server = MockServer::start().await;
    let repeated_action = json!({
        "type": "tool",
        "server": TERMINAL_SERVER_NAME,
        "tool": "run",
        "args": {"command": "echo", "args": ["hi"]},
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            json!({"message": {"content": repeated_action}}).to_string(),
            "application/json",
        ))
        .mount(&model_server)
        .await;

    let model = ModelClient::new(model_server.uri(), "local-model");
    let config = AgentLoopConfig { max_steps: 4, terminal_server_name: TERMINAL_SERVER_NAME.to_string() };
    let mut agent = AgentLoop::with_config(model, vec![server], config);

    let reply = agent.handle_user_message("run echo hi twice").await;
    assert!(reply.contains("turns"), "loop exhausts its budget rather than looping on repeats: {reply}");

    let transcript = agent
        .history()
        .messages()
        .iter()
        .filter(|m| m.content.contains("already called this turn"))
        .count();
    assert!(transcript >= 1, "a repeat of the same tool call is recognized and skipped");
}
