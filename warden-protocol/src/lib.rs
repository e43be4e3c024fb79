//! Shared data model and wire types for the secure terminal tool server
//! and the agent orchestration loop.
//!
//! This crate has no I/O of its own: it defines the JSON-shaped values
//! that flow across the agent↔server boundary (and, for the policy
//! file, across the disk↔process boundary) so that `warden-core`,
//! `warden-mcp-server` and `warden-agent` share one definition instead
//! of re-deriving `Serialize`/`Deserialize` on slightly different
//! structs.

pub mod action;
pub mod audit;
pub mod confirmation;
pub mod error;
pub mod policy;
pub mod tool;

pub use action::Action;
pub use audit::{AuditEntry, AuditEvent};
pub use confirmation::{ConfirmationStage, PendingConfirmation};
pub use error::{Result, WardenError};
pub use policy::{DangerousPatternFile, PolicyFile};
pub use tool::{ContentBlock, StructuredContent, TextContent, ToolInfo, ToolRequest, ToolResponse};
