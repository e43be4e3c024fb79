//! Argument validation applied before any command is considered for
//! execution.
//!
//! A coarse, lexical first filter applied before any process spawn. The
//! danger classifier performs the semantic checks this guard does not
//! attempt.

use crate::path_resolver::resolve_sandbox_path;
use crate::policy::Policy;
use warden_protocol::WardenError;

/// 1. Reject if any argument matches a `blockedArgsRegex` entry.
/// 2. Reject if any argument contains the literal `..`.
/// 3. For any argument beginning with `/`, require it resolves inside the
///    sandbox root.
pub fn check_args(policy: &Policy, args: &[String]) -> Result<(), WardenError> {
    for pattern in &policy.blocked_args_regex {
        for arg in args {
            if pattern.is_match(arg) {
                return Err(WardenError::BlockedArgument(format!(
                    "argument '{arg}' matches blocked pattern '{}'",
                    pattern.as_str()
                )));
            }
        }
    }

    for arg in args {
        if arg.contains("..") {
            return Err(WardenError::BlockedArgument(format!(
                "argument '{arg}' contains '..'"
            )));
        }
    }

    for arg in args {
        if arg.starts_with('/') {
            resolve_sandbox_path(&policy.sandbox_root, arg)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::path::PathBuf;

    fn policy_with(blocked: Vec<&str>, sandbox_root: &str) -> Policy {
        Policy {
            sandbox_root: PathBuf::from(sandbox_root),
            audit_log_path: PathBuf::from(sandbox_root).join("audit.log"),
            allowed_commands: std::iter::once("ls".to_string()).collect(),
            blocked_args_regex: blocked
                .into_iter()
                .map(|p| regex::Regex::new(p).expect("valid regex"))
                .collect(),
            dangerous_commands: Default::default(),
            dangerous_patterns: vec![],
            confirm_ttl_seconds: 90,
            max_output_chars: 20_000,
            max_file_read_bytes: 200_000,
        }
    }

    #[test]
    fn blocked_regex_rejects_matching_argument() {
        let policy = policy_with(vec!["^--upload-file$"], "/sandbox");
        let err = check_args(&policy, &["--upload-file".to_string()]).unwrap_err();
        assert!(matches!(err, WardenError::BlockedArgument(_)));
    }

    #[test]
    fn dot_dot_literal_is_rejected() {
        let policy = policy_with(vec![], "/sandbox");
        let err = check_args(&policy, &["../etc/passwd".to_string()]).unwrap_err();
        assert!(matches!(err, WardenError::BlockedArgument(_)));
    }

    #[test]
    fn absolute_argument_outside_sandbox_is_rejected() {
        let policy = policy_with(vec![], "/sandbox");
        let err = check_args(&policy, &["/etc/passwd".to_string()]).unwrap_err();
        assert!(matches!(err, WardenError::PathEscape(_)));
    }

    #[test]
    fn absolute_argument_inside_sandbox_is_allowed() {
        let policy = policy_with(vec![], "/sandbox");
        check_args(&policy, &["/sandbox/file.txt".to_string()]).expect("allowed");
    }

    #[test]
    fn ordinary_arguments_pass() {
        let policy = policy_with(vec![], "/sandbox");
        check_args(&policy, &["-la".to_string(), "file.txt".to_string()]).expect("allowed");
    }
}
