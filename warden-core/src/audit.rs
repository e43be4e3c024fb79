//! The append-only audit log.
//!
//! Appends one JSON object per line to the audit log using append-mode I/O.
//! Guarded by a `tokio::sync::Mutex` so a single `write_all` call per entry
//! is the only writer at a time, even if a future caller stops assuming a
//! single-threaded server. Audit failures are logged, never propagated: a
//! tool call's result does not depend on the sink succeeding.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use warden_protocol::{AuditEntry, AuditEvent};

pub struct AuditSink {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl AuditSink {
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `event` with a fresh UTC timestamp. Failures are logged at
    /// `error` level and swallowed: the caller's tool call has already
    /// succeeded or failed on its own merits.
    pub async fn append(&self, event: AuditEvent) {
        let entry = AuditEntry {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            event,
        };
        if let Err(e) = self.try_append(&entry).await {
            tracing::error!(path = ?self.path, error = %e, "audit append failed");
        }
    }

    async fn try_append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut line = serde_json::to_string(entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        line.push('\n');
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[tokio::test]
    async fn appends_one_json_line_per_event() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");
        let sink = AuditSink::open(&path).await.expect("open sink");

        sink.append(AuditEvent::RunExecuted {
            command: "ls".to_string(),
            args: vec![],
            cwd: "/sandbox".to_string(),
            exit_code: Some(0),
        })
        .await;
        sink.append(AuditEvent::ConfirmCancel {
            token: "tok".to_string(),
            existed: true,
        })
        .await;

        let contents = tokio::fs::read_to_string(&path).await.expect("read log");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).expect("valid json line");
            assert!(value.get("ts").is_some());
            assert!(value.get("event").is_some());
        }
    }

    #[tokio::test]
    async fn reopening_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");
        {
            let sink = AuditSink::open(&path).await.expect("open sink");
            sink.append(AuditEvent::ConfirmCancel {
                token: "a".to_string(),
                existed: false,
            })
            .await;
        }
        {
            let sink = AuditSink::open(&path).await.expect("reopen sink");
            sink.append(AuditEvent::ConfirmCancel {
                token: "b".to_string(),
                existed: false,
            })
            .await;
        }
        let contents = tokio::fs::read_to_string(&path).await.expect("read log");
        assert_eq!(contents.lines().count(), 2);
    }
}
