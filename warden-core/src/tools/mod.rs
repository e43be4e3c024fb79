//! The user-facing tool implementations.
//!
//! Each tool is a small async function taking a [`ToolContext`] and a
//! typed, `serde`-deserialized argument struct, returning a
//! [`warden_protocol::ToolResponse`]. The Tool Server (`warden-mcp-server`)
//! owns request framing and argument validation against the JSON schema;
//! these functions own the policy-sensitive behavior.

mod confirm_cancel;
mod context;
mod files;
mod run;
mod search;
mod ssh;

pub use confirm_cancel::{cancel, confirm, CancelArgs, ConfirmArgs};
pub use context::ToolContext;
pub use files::{diff, read_file, write_file, DiffArgs, ReadFileArgs, WriteFileArgs, WriteMode};
pub use run::{run, RunArgs};
pub use search::{find_files, search, FindFilesArgs, SearchArgs};
pub use ssh::{generate_ssh_key, GenerateSshKeyArgs};
