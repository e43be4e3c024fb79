//! The `generate_ssh_key` tool. Unlike every other tool, this one always
//! requires confirmation regardless of policy — there is no allowlist
//! bypass for it, and it routes through `ssh-keygen` like any other
//! confirmed command once approved.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use warden_protocol::{AuditEvent, StructuredContent, ToolResponse, WardenError};

use super::context::ToolContext;
use super::run::expiry_timestamp;

#[derive(Debug, Default, Deserialize)]
pub struct GenerateSshKeyArgs {
    #[serde(default, rename = "type")]
    pub key_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub overwrite: Option<bool>,
}

fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(std::path::MAIN_SEPARATOR)
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

pub async fn generate_ssh_key(
    ctx: &ToolContext,
    request: GenerateSshKeyArgs,
) -> Result<ToolResponse, WardenError> {
    let key_type = request.key_type.unwrap_or_else(|| "ed25519".to_string());
    let filename = request.filename.unwrap_or_else(|| "id_ed25519".to_string());
    let comment = request.comment.unwrap_or_else(|| "smartos-mcp".to_string());
    let passphrase = request.passphrase.unwrap_or_default();
    let overwrite = request.overwrite.unwrap_or(false);

    if !is_safe_filename(&filename) {
        return Err(WardenError::BlockedArgument(format!(
            "'{filename}' is not a valid key filename"
        )));
    }

    let home = dirs::home_dir().ok_or_else(|| {
        WardenError::IoFailure(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no home directory",
        ))
    })?;
    let ssh_dir = home.join(".ssh");
    if !ssh_dir.exists() {
        tokio::fs::create_dir_all(&ssh_dir).await?;
        let _ = set_permissions(&ssh_dir, 0o700).await;
    }

    let key_path = ssh_dir.join(&filename);
    let pub_path = ssh_dir.join(format!("{filename}.pub"));
    if !overwrite && (key_path.exists() || pub_path.exists()) {
        return Err(WardenError::BlockedArgument(format!(
            "a key named '{filename}' already exists; pass overwrite=true to replace it"
        )));
    }

    let command = "ssh-keygen".to_string();
    let args = vec![
        "-t".to_string(),
        key_type.clone(),
        "-f".to_string(),
        key_path.display().to_string(),
        "-C".to_string(),
        comment,
        "-N".to_string(),
        passphrase,
    ];
    let reason = "generating an SSH key always requires confirmation".to_string();

    let token = ctx
        .confirmations
        .issue(command.clone(), args.clone(), ssh_dir.clone(), reason.clone())
        .await;
    ctx.audit
        .append(AuditEvent::SshKeygenRequiresConfirmationStage1 {
            token: token.clone(),
            key_type,
            key_path: key_path.display().to_string(),
            overwrite,
        })
        .await;

    let expires_at = expiry_timestamp(ctx.policy.confirm_ttl_seconds);
    let structured = StructuredContent::confirmation(token.clone(), reason, expires_at);
    let text = format!(
        "Generating '{filename}' requires confirmation. Call confirm with token {token} to proceed."
    );
    Ok(ToolResponse::text_with_structured(text, structured))
}

/// After an approved `ssh-keygen` run, tighten permissions the way `ssh`
/// expects: `700` on `~/.ssh`, `600` on the private key, `644` on the
/// public key. Best effort — a failure here does not undo the key.
pub(super) async fn postprocess_after_execute(command: &str, args: &[String]) {
    if command != "ssh-keygen" {
        return;
    }
    let Some(idx) = args.iter().position(|a| a == "-f") else {
        return;
    };
    let Some(key_path) = args.get(idx + 1) else {
        return;
    };
    let key_path = PathBuf::from(key_path);
    if let Some(dir) = key_path.parent() {
        let _ = set_permissions(dir, 0o700).await;
    }
    let _ = set_permissions(&key_path, 0o600).await;
    let pub_path = PathBuf::from(format!("{}.pub", key_path.display()));
    let _ = set_permissions(&pub_path, 0o644).await;
}

#[cfg(unix)]
async fn set_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_permissions(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn rejects_filenames_with_path_separators() {
        assert!(!is_safe_filename("../escape"));
        assert!(!is_safe_filename("sub/key"));
    }

    #[test]
    fn accepts_ordinary_filenames() {
        assert!(is_safe_filename("id_ed25519"));
        assert!(is_safe_filename("work-key.pem"));
    }

    #[tokio::test]
    async fn generating_a_key_always_issues_a_confirmation() {
        use crate::confirm::ConfirmationStore;
        use crate::{AuditSink, Policy};
        use std::collections::HashSet;
        use std::sync::Arc;

        let tmp = tempfile::tempdir().expect("tempdir");
        std::env::set_var("HOME", tmp.path());
        let sandbox_root = tmp.path().join("sandbox");
        std::fs::create_dir_all(&sandbox_root).expect("mkdir sandbox");
        let audit_log_path = sandbox_root.join("audit.log");
        let policy = Policy {
            sandbox_root,
            audit_log_path: audit_log_path.clone(),
            allowed_commands: HashSet::from(["ssh-keygen".to_string()]),
            blocked_args_regex: vec![],
            dangerous_commands: HashSet::new(),
            dangerous_patterns: vec![],
            confirm_ttl_seconds: 90,
            max_output_chars: 20_000,
            max_file_read_bytes: 200_000,
        };
        let audit = AuditSink::open(&audit_log_path).await.expect("open audit");
        let ctx = ToolContext::new(
            Arc::new(policy),
            Arc::new(audit),
            Arc::new(ConfirmationStore::new(90)),
        );

        let response = generate_ssh_key(&ctx, GenerateSshKeyArgs::default())
            .await
            .expect("issues a confirmation rather than erroring");
        let structured = response.structured_content.expect("structured content");
        assert!(structured.requires_confirmation);
        assert_eq!(ctx.confirmations.len().await, 1);
    }

    #[tokio::test]
    async fn rejects_an_unsafe_filename_before_touching_disk() {
        use crate::confirm::ConfirmationStore;
        use crate::{AuditSink, Policy};
        use std::collections::HashSet;
        use std::sync::Arc;

        let tmp = tempfile::tempdir().expect("tempdir");
        let sandbox_root = tmp.path().join("sandbox");
        std::fs::create_dir_all(&sandbox_root).expect("mkdir sandbox");
        let audit_log_path = sandbox_root.join("audit.log");
        let policy = Policy {
            sandbox_root,
            audit_log_path: audit_log_path.clone(),
            allowed_commands: HashSet::from(["ssh-keygen".to_string()]),
            blocked_args_regex: vec![],
            dangerous_commands: HashSet::new(),
            dangerous_patterns: vec![],
            confirm_ttl_seconds: 90,
            max_output_chars: 20_000,
            max_file_read_bytes: 200_000,
        };
        let audit = AuditSink::open(&audit_log_path).await.expect("open audit");
        let ctx = ToolContext::new(
            Arc::new(policy),
            Arc::new(audit),
            Arc::new(ConfirmationStore::new(90)),
        );

        let err = generate_ssh_key(
            &ctx,
            GenerateSshKeyArgs {
                filename: Some("../escape".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WardenError::BlockedArgument(_)));
    }
}
