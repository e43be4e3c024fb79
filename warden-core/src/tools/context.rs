use std::sync::Arc;

use crate::{AuditSink, ConfirmationStore, Policy};

/// Shared state every tool handler needs: the validated policy, the
/// append-only audit sink, and the confirmation token store. Cloning is
/// cheap — every field is an `Arc`.
#[derive(Clone)]
pub struct ToolContext {
    pub policy: Arc<Policy>,
    pub audit: Arc<AuditSink>,
    pub confirmations: Arc<ConfirmationStore>,
}

impl ToolContext {
    pub fn new(policy: Arc<Policy>, audit: Arc<AuditSink>, confirmations: Arc<ConfirmationStore>) -> Self {
        Self {
            policy,
            audit,
            confirmations,
        }
    }
}
