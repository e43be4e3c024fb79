//! Tool registration and dispatch: the schema each tool advertises to
//! clients, and the match arm that deserializes arguments and calls into
//! `warden_core::tools`.

use serde_json::{json, Value};

use warden_core::tools::{self, ToolContext};
use warden_protocol::{ToolInfo, ToolResponse, WardenError};

pub fn catalogue() -> Vec<ToolInfo> {
    vec![
        ToolInfo {
            name: "run".to_string(),
            description: Some("Run an allowlisted command in the sandbox.".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string"},
                    "args": {"type": "array", "items": {"type": "string"}},
                    "cwd": {"type": "string"},
                },
                "required": ["command"],
            })),
        },
        ToolInfo {
            name: "confirm".to_string(),
            description: Some("Advance or execute a pending confirmation token.".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {"token": {"type": "string"}},
                "required": ["token"],
            })),
        },
        ToolInfo {
            name: "cancel".to_string(),
            description: Some("Cancel a pending confirmation token.".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {"token": {"type": "string"}},
                "required": ["token"],
            })),
        },
        ToolInfo {
            name: "read_file".to_string(),
            description: Some("Read a file inside the sandbox.".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"],
            })),
        },
        ToolInfo {
            name: "write_file".to_string(),
            description: Some("Write a file inside the sandbox.".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "content": {"type": "string"},
                    "mode": {"type": "string", "enum": ["overwrite", "append", "create"]},
                },
                "required": ["path", "content"],
            })),
        },
        ToolInfo {
            name: "diff".to_string(),
            description: Some("Produce a unified diff against a file's current content.".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "newContent": {"type": "string"},
                },
                "required": ["path", "newContent"],
            })),
        },
        ToolInfo {
            name: "search".to_string(),
            description: Some("Search the sandbox for a literal substring.".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "maxMatches": {"type": "integer"},
                },
                "required": ["query"],
            })),
        },
        ToolInfo {
            name: "find_files".to_string(),
            description: Some("Find files under a directory by extension, name, or recency.".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "dir": {"type": "string"},
                    "extensions": {"type": "array", "items": {"type": "string"}},
                    "nameContains": {"type": "string"},
                    "maxResults": {"type": "integer"},
                    "modifiedWithinMinutes": {"type": "integer"},
                    "followSymlinks": {"type": "boolean"},
                },
                "required": ["dir"],
            })),
        },
        ToolInfo {
            name: "generate_ssh_key".to_string(),
            description: Some("Generate an SSH key pair (always requires confirmation).".to_string()),
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "type": {"type": "string", "enum": ["ed25519", "rsa"]},
                    "filename": {"type": "string"},
                    "comment": {"type": "string"},
                    "passphrase": {"type": "string"},
                    "overwrite": {"type": "boolean"},
                },
            })),
        },
    ]
}

pub async fn dispatch(ctx: &ToolContext, name: &str, arguments: Value) -> Result<ToolResponse, WardenError> {
    match name {
        "run" => tools::run(ctx, from_args(arguments)?).await,
        "confirm" => tools::confirm(ctx, from_args(arguments)?).await,
        "cancel" => tools::cancel(ctx, from_args(arguments)?).await,
        "read_file" => tools::read_file(ctx, from_args(arguments)?).await,
        "write_file" => tools::write_file(ctx, from_args(arguments)?).await,
        "diff" => tools::diff(ctx, from_args(arguments)?).await,
        "search" => tools::search(ctx, from_args(arguments)?).await,
        "find_files" => tools::find_files(ctx, from_args(arguments)?).await,
        "generate_ssh_key" => tools::generate_ssh_key(ctx, from_args(arguments)?).await,
        other => Err(WardenError::ActionInvalid(format!("unknown tool '{other}'"))),
    }
}

fn from_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, WardenError> {
    serde_json::from_value(arguments)
        .map_err(|e| WardenError::ActionInvalid(format!("invalid tool arguments: {e}")))
}
