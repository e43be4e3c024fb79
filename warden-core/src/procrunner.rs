//! Never-through-a-shell process execution with output capture.
//!
//! Spawns the executable with the exact argument vector — never through a
//! shell, never by concatenating arguments into a command line. Standard
//! input is closed; stdout/stderr are captured as byte streams, decoded
//! UTF-8 (lossy), and clamped to `maxOutputChars` with a truncation suffix.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::Command;

use warden_protocol::WardenError;

const TRUNCATION_SUFFIX: &str = "\n... [output truncated]";
const NO_OUTPUT: &str = "(no output)";

#[derive(Debug)]
pub struct RunOutput {
    pub output: String,
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

/// Spawn `command` with `args` in `cwd`, capture stdout/stderr, and combine
/// them per the design: `stdout + "\n[stderr]\n" + stderr` when stderr is
/// non-empty, else just stdout; empty overall output becomes `"(no output)"`.
/// Each stream is independently clamped to `max_output_chars` before being
/// combined, so the combined string's length never exceeds
/// `2 * max_output_chars + 2 * |suffix| + |"\n[stderr]\n"|`.
pub async fn run(
    command: &str,
    args: &[String],
    cwd: &Path,
    max_output_chars: usize,
) -> Result<RunOutput, WardenError> {
    let start = Instant::now();
    let mut child = Command::new(command)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| WardenError::SpawnFailure(format!("{command}: {e}")))?;

    let mut stdout_raw = Vec::new();
    let mut stderr_raw = Vec::new();
    if let Some(mut stdout) = child.stdout.take() {
        let _ = stdout.read_to_end(&mut stdout_raw).await;
    }
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_end(&mut stderr_raw).await;
    }

    let status = child
        .wait()
        .await
        .map_err(|e| WardenError::SpawnFailure(format!("{command}: {e}")))?;

    let stdout = clamp(&String::from_utf8_lossy(&stdout_raw), max_output_chars);
    let stderr = clamp(&String::from_utf8_lossy(&stderr_raw), max_output_chars);

    let output = if stderr.is_empty() {
        stdout
    } else {
        format!("{stdout}\n[stderr]\n{stderr}")
    };
    let output = if output.is_empty() {
        NO_OUTPUT.to_string()
    } else {
        output
    };

    Ok(RunOutput {
        output,
        exit_code: status.code(),
        duration: start.elapsed(),
    })
}

fn clamp(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}{TRUNCATION_SUFFIX}")
}
