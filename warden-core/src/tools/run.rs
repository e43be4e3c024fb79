//! The `run` tool: execute an allowlisted command in the sandbox, subject
//! to the argument guard and danger classifier before anything is spawned.

use serde::Deserialize;

use warden_protocol::{AuditEvent, StructuredContent, ToolResponse, WardenError};

use crate::danger;
use crate::guard;
use crate::path_resolver::resolve_sandbox_path;
use crate::procrunner;

use super::context::ToolContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunArgs {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
}

pub async fn run(ctx: &ToolContext, request: RunArgs) -> Result<ToolResponse, WardenError> {
    let RunArgs { command, args, cwd } = request;

    if !ctx.policy.allowed_commands.contains(&command) {
        return Err(WardenError::NotAllowed(command));
    }

    let resolved_cwd = match cwd {
        Some(path) => resolve_sandbox_path(&ctx.policy.sandbox_root, &path)?,
        None => ctx.policy.sandbox_root.clone(),
    };

    guard::check_args(&ctx.policy, &args)?;

    if let Some(reason) = danger::classify(&ctx.policy, &command, &args) {
        let token = ctx
            .confirmations
            .issue(command.clone(), args.clone(), resolved_cwd.clone(), reason.clone())
            .await;
        let expires_at = expiry_timestamp(ctx.policy.confirm_ttl_seconds);
        ctx.audit
            .append(AuditEvent::RunRequiresConfirmationStage1 {
                token: token.clone(),
                command: command.clone(),
                args: args.clone(),
                cwd: resolved_cwd.display().to_string(),
                reason: reason.clone(),
            })
            .await;
        let structured = StructuredContent::confirmation(token.clone(), reason.clone(), expires_at);
        let text = format!(
            "'{command}' {reason} and requires confirmation. Call confirm with token {token} to proceed."
        );
        return Ok(ToolResponse::text_with_structured(text, structured));
    }

    let output = procrunner::run(&command, &args, &resolved_cwd, ctx.policy.max_output_chars).await?;
    ctx.audit
        .append(AuditEvent::RunExecuted {
            command,
            args,
            cwd: resolved_cwd.display().to_string(),
            exit_code: output.exit_code,
        })
        .await;
    Ok(ToolResponse::text(output.output))
}

pub(crate) fn expiry_timestamp(ttl_seconds: u64) -> String {
    let expires_at = chrono::Utc::now() + chrono::Duration::seconds(ttl_seconds as i64);
    expires_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
