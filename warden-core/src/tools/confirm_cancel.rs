//! The `confirm` and `cancel` tools driving the two-stage confirmation
//! state machine: `confirm` on a stage-1 token issues a stage-2 token;
//! `confirm` on a stage-2 token executes the captured command.

use serde::Deserialize;

use warden_protocol::{AuditEvent, StructuredContent, ToolResponse, WardenError};

use crate::procrunner;

use super::context::ToolContext;
use super::run::expiry_timestamp;
use super::ssh;

#[derive(Debug, Deserialize)]
pub struct ConfirmArgs {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelArgs {
    pub token: String,
}

pub async fn confirm(ctx: &ToolContext, request: ConfirmArgs) -> Result<ToolResponse, WardenError> {
    let token = request.token;
    match ctx.confirmations.advance(&token).await {
        Ok((token2, record)) => {
            ctx.audit
                .append(AuditEvent::ConfirmStage1IssuedStage2 {
                    token1: token,
                    token2: token2.clone(),
                    command: record.command.clone(),
                    args: record.args.clone(),
                    cwd: record.cwd.display().to_string(),
                    reason: record.reason.clone(),
                })
                .await;
            let expires_at = expiry_timestamp(ctx.policy.confirm_ttl_seconds);
            let structured =
                StructuredContent::confirmation(token2.clone(), record.reason.clone(), expires_at);
            let text = format!(
                "Stage 2 confirmation required for '{}'. Call confirm again with token {token2} to execute.",
                record.command
            );
            Ok(ToolResponse::text_with_structured(text, structured))
        }
        Err(WardenError::WrongStage) => {
            let record = ctx.confirmations.execute(&token).await?;
            let output = procrunner::run(
                &record.command,
                &record.args,
                &record.cwd,
                ctx.policy.max_output_chars,
            )
            .await?;
            ssh::postprocess_after_execute(&record.command, &record.args).await;
            ctx.audit
                .append(AuditEvent::ConfirmExecuted {
                    token,
                    stage: 2,
                    command: record.command,
                    args: record.args,
                    cwd: record.cwd.display().to_string(),
                    reason: record.reason,
                    exit_code: output.exit_code,
                })
                .await;
            Ok(ToolResponse::text(output.output))
        }
        Err(e) => Err(e),
    }
}

pub async fn cancel(ctx: &ToolContext, request: CancelArgs) -> Result<ToolResponse, WardenError> {
    let existed = ctx.confirmations.cancel(&request.token).await;
    ctx.audit
        .append(AuditEvent::ConfirmCancel {
            token: request.token,
            existed,
        })
        .await;
    let text = if existed {
        "Confirmation cancelled."
    } else {
        "No pending confirmation for that token."
    };
    Ok(ToolResponse::text(text))
}
