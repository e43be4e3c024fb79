//! The two-stage confirmation token store.
//!
//! Owned exclusively by the tool server process, which handles requests one
//! at a time, so no locking is required beyond what lets the store be
//! shared behind an `Arc` the way the rest of the server state is. Expiry
//! is checked lazily on access — no background sweeper — which keeps the
//! concurrency model single-threaded and eliminates a class of races.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use uuid::Uuid;

use warden_protocol::{ConfirmationStage, PendingConfirmation, WardenError};

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn fresh_token() -> String {
    // UUID v4 carries 122 bits of randomness, satisfying the store's
    // entropy invariant directly.
    Uuid::new_v4().to_string()
}

pub struct ConfirmationStore {
    ttl_seconds: u64,
    records: Mutex<HashMap<String, PendingConfirmation>>,
}

impl ConfirmationStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Create a stage-1 record for `(command, args, cwd)` with expiry
    /// `now + ttl`. Returns the fresh token.
    pub async fn issue(
        &self,
        command: String,
        args: Vec<String>,
        cwd: PathBuf,
        reason: String,
    ) -> String {
        let token = fresh_token();
        let now = now_ms();
        let record = PendingConfirmation {
            token: token.clone(),
            stage: ConfirmationStage::Stage1,
            created_at_ms: now,
            expires_at_ms: now + self.ttl_seconds * 1000,
            command,
            args,
            cwd,
            reason,
        };
        self.records.lock().await.insert(token.clone(), record);
        token
    }

    /// Atomically retire a stage-1 token and emit a stage-2 token for the
    /// same payload, extending the expiry by `ttl`. Single-use: the stage-1
    /// token is gone after this call whether or not the caller uses the
    /// stage-2 token.
    pub async fn advance(&self, token1: &str) -> Result<(String, PendingConfirmation), WardenError> {
        let mut records = self.records.lock().await;
        let record = take_valid(&mut records, token1, now_ms())?;
        if record.stage != ConfirmationStage::Stage1 {
            // Stage-2 tokens cannot be advanced again; put it back untouched.
            records.insert(token1.to_string(), record);
            return Err(WardenError::WrongStage);
        }

        let token2 = fresh_token();
        let now = now_ms();
        let stage2 = PendingConfirmation {
            token: token2.clone(),
            stage: ConfirmationStage::Stage2,
            created_at_ms: now,
            expires_at_ms: now + self.ttl_seconds * 1000,
            command: record.command,
            args: record.args,
            cwd: record.cwd,
            reason: record.reason,
        };
        records.insert(token2.clone(), stage2.clone());
        Ok((token2, stage2))
    }

    /// Atomically retire a stage-2 token and return its captured payload.
    /// Fails with `WrongStage` if given a stage-1 token.
    pub async fn execute(&self, token2: &str) -> Result<PendingConfirmation, WardenError> {
        let mut records = self.records.lock().await;
        let record = take_valid(&mut records, token2, now_ms())?;
        if record.stage != ConfirmationStage::Stage2 {
            records.insert(token2.to_string(), record);
            return Err(WardenError::WrongStage);
        }
        Ok(record)
    }

    /// Idempotent removal. Returns whether a record existed (expired
    /// records are treated as absent).
    pub async fn cancel(&self, token: &str) -> bool {
        let mut records = self.records.lock().await;
        match records.remove(token) {
            Some(record) => !record.is_expired(now_ms()),
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

/// Remove and return `token` if present and unexpired; expired entries are
/// dropped (lazy expiry) and treated as missing.
fn take_valid(
    records: &mut HashMap<String, PendingConfirmation>,
    token: &str,
    now: u64,
) -> Result<PendingConfirmation, WardenError> {
    match records.remove(token) {
        None => Err(WardenError::ConfirmationMissing),
        Some(record) if record.is_expired(now) => Err(WardenError::ConfirmationExpired),
        Some(record) => Ok(record),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[tokio::test]
    async fn issue_then_advance_then_execute_consumes_each_token_once() {
        let store = ConfirmationStore::new(90);
        let token1 = store
            .issue(
                "rm".to_string(),
                vec!["-rf".to_string(), "x".to_string()],
                PathBuf::from("/sandbox"),
                "always dangerous".to_string(),
            )
            .await;

        let (token2, _) = store.advance(&token1).await.expect("advance");
        assert!(store.advance(&token1).await.is_err(), "stage-1 token is single-use");

        let executed = store.execute(&token2).await.expect("execute");
        assert_eq!(executed.command, "rm");
        assert!(store.execute(&token2).await.is_err(), "stage-2 token is single-use");
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn execute_on_stage1_token_fails_wrong_stage() {
        let store = ConfirmationStore::new(90);
        let token1 = store
            .issue(
                "rm".to_string(),
                vec![],
                PathBuf::from("/sandbox"),
                "reason".to_string(),
            )
            .await;
        let err = store.execute(&token1).await.unwrap_err();
        assert!(matches!(err, WardenError::WrongStage));
        // The token survives a failed wrong-stage attempt.
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_token_is_confirmation_missing() {
        let store = ConfirmationStore::new(90);
        let err = store.execute("nonexistent").await.unwrap_err();
        assert!(matches!(err, WardenError::ConfirmationMissing));
    }

    #[tokio::test]
    async fn expired_token_is_confirmation_expired_and_then_gone() {
        let store = ConfirmationStore::new(0);
        let token1 = store
            .issue(
                "rm".to_string(),
                vec![],
                PathBuf::from("/sandbox"),
                "reason".to_string(),
            )
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let err = store.advance(&token1).await.unwrap_err();
        assert!(matches!(err, WardenError::ConfirmationExpired));
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let store = ConfirmationStore::new(90);
        let token1 = store
            .issue(
                "rm".to_string(),
                vec![],
                PathBuf::from("/sandbox"),
                "reason".to_string(),
            )
            .await;
        assert!(store.cancel(&token1).await);
        assert!(!store.cancel(&token1).await);
    }
}
