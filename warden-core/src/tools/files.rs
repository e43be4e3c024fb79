//! The `read_file`, `write_file`, and `diff` tools. All paths are resolved
//! through the sandbox path resolver before any filesystem access.

use std::io::ErrorKind;

use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use warden_protocol::{AuditEvent, ToolResponse, WardenError};

use crate::path_resolver::resolve_sandbox_path;

use super::context::ToolContext;

#[derive(Debug, Deserialize)]
pub struct ReadFileArgs {
    pub path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileArgs {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub mode: WriteMode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffArgs {
    pub path: String,
    pub new_content: String,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
    Create,
}

pub async fn read_file(ctx: &ToolContext, request: ReadFileArgs) -> Result<ToolResponse, WardenError> {
    let resolved = resolve_sandbox_path(&ctx.policy.sandbox_root, &request.path)?;
    let metadata = tokio::fs::metadata(&resolved).await?;
    if !metadata.is_file() {
        return Err(WardenError::IoFailure(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("'{}' is not a regular file", request.path),
        )));
    }

    let cap = ctx.policy.max_file_read_bytes as u64;
    let file = tokio::fs::File::open(&resolved).await?;
    let mut limited = file.take(cap + 1);
    let mut buf = Vec::new();
    limited.read_to_end(&mut buf).await?;

    let truncated = buf.len() as u64 > cap;
    if truncated {
        buf.truncate(cap as usize);
    }
    let mut text = String::from_utf8_lossy(&buf).into_owned();
    if truncated {
        text.push_str("\n... [truncated]");
    }

    ctx.audit
        .append(AuditEvent::ReadFile {
            path: resolved.display().to_string(),
            bytes: buf.len(),
        })
        .await;
    Ok(ToolResponse::text(text))
}

pub async fn write_file(ctx: &ToolContext, request: WriteFileArgs) -> Result<ToolResponse, WardenError> {
    let resolved = resolve_sandbox_path(&ctx.policy.sandbox_root, &request.path)?;
    if let Some(parent) = resolved.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    match request.mode {
        WriteMode::Overwrite => {
            tokio::fs::write(&resolved, request.content.as_bytes()).await?;
        }
        WriteMode::Append => {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&resolved)
                .await?;
            file.write_all(request.content.as_bytes()).await?;
        }
        WriteMode::Create => {
            let mut file = tokio::fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&resolved)
                .await?;
            file.write_all(request.content.as_bytes()).await?;
        }
    }

    ctx.audit
        .append(AuditEvent::WriteFile {
            path: resolved.display().to_string(),
            bytes: request.content.len(),
        })
        .await;
    Ok(ToolResponse::text(format!(
        "wrote {} bytes to {}",
        request.content.len(),
        resolved.display()
    )))
}

pub async fn diff(ctx: &ToolContext, request: DiffArgs) -> Result<ToolResponse, WardenError> {
    let resolved = resolve_sandbox_path(&ctx.policy.sandbox_root, &request.path)?;
    let old_content = match tokio::fs::read_to_string(&resolved).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let rel = resolved
        .strip_prefix(&ctx.policy.sandbox_root)
        .unwrap_or(&resolved);
    let a_label = format!("a/{}", rel.display());
    let b_label = format!("b/{}", rel.display());

    let text_diff = similar::TextDiff::from_lines(&old_content, &request.new_content);
    let patch = text_diff
        .unified_diff()
        .context_radius(3)
        .header(&a_label, &b_label)
        .to_string();
    let patch = if patch.trim().is_empty() {
        "(no diff)".to_string()
    } else {
        patch
    };

    ctx.audit
        .append(AuditEvent::Diff {
            path: resolved.display().to_string(),
            bytes: patch.len(),
        })
        .await;
    Ok(ToolResponse::text(patch))
}
