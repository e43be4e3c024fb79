use serde::Serialize;

/// One JSON-line audit record. `ts` is stamped by the sink at append time
/// so every event kind below carries only its own payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub ts: String,
    #[serde(flatten)]
    pub event: AuditEvent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    RunRequiresConfirmationStage1 {
        token: String,
        command: String,
        args: Vec<String>,
        cwd: String,
        reason: String,
    },
    RunExecuted {
        command: String,
        args: Vec<String>,
        cwd: String,
        #[serde(rename = "exitCode")]
        exit_code: Option<i32>,
    },
    ConfirmStage1IssuedStage2 {
        token1: String,
        token2: String,
        command: String,
        args: Vec<String>,
        cwd: String,
        reason: String,
    },
    ConfirmExecuted {
        token: String,
        stage: u8,
        command: String,
        args: Vec<String>,
        cwd: String,
        reason: String,
        #[serde(rename = "exitCode")]
        exit_code: Option<i32>,
    },
    ConfirmCancel {
        token: String,
        existed: bool,
    },
    SshKeygenRequiresConfirmationStage1 {
        token: String,
        #[serde(rename = "keyType")]
        key_type: String,
        #[serde(rename = "keyPath")]
        key_path: String,
        overwrite: bool,
    },
    ReadFile {
        path: String,
        bytes: usize,
    },
    WriteFile {
        path: String,
        bytes: usize,
    },
    Diff {
        path: String,
        bytes: usize,
    },
    Search {
        path: String,
        matches: usize,
    },
    FindFiles {
        path: String,
        matches: usize,
    },
}
