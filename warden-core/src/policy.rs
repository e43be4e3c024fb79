//! Policy loading and validation.
//!
//! Reads the declarative policy file and compiles it into an immutable
//! [`Policy`] value. Resolution rules: `sandboxRoot` is resolved against the
//! current working directory; `auditLogPath` is resolved against
//! `sandboxRoot` when relative. The audit directory is created recursively
//! before any tool is served, matching the loader's "ensure before serving"
//! contract.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use warden_protocol::{DangerousPatternFile, PolicyFile, WardenError};

/// A compiled `{command, argsAnyOf?, argsRegexAnyOf?}` rule.
#[derive(Debug, Clone)]
pub struct DangerousPattern {
    pub command: String,
    pub args_any_of: HashSet<String>,
    pub args_regex_any_of: Vec<Regex>,
}

/// The validated, immutable security policy a tool server process loads
/// once at startup. `allowedCommands` is guaranteed non-empty and every
/// entry matches `[A-Za-z0-9._-]+`.
#[derive(Debug, Clone)]
pub struct Policy {
    pub sandbox_root: PathBuf,
    pub audit_log_path: PathBuf,
    pub allowed_commands: HashSet<String>,
    pub blocked_args_regex: Vec<Regex>,
    pub dangerous_commands: HashSet<String>,
    pub dangerous_patterns: Vec<DangerousPattern>,
    pub confirm_ttl_seconds: u64,
    pub max_output_chars: usize,
    pub max_file_read_bytes: usize,
}

/// Base names must be free of path separators and shell metacharacters.
pub fn is_valid_executable_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl Policy {
    /// Load and validate a policy file from `path`, resolving relative
    /// fields against `cwd`. Fails with `PolicyInvalid` if `allowedCommands`
    /// is missing/empty, any command name is malformed, or any regex fails
    /// to compile — the loader fails fast rather than at first use.
    pub fn load(path: &Path, cwd: &Path) -> Result<Self, WardenError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| WardenError::PolicyInvalid(format!("reading {path:?}: {e}")))?;
        let file: PolicyFile = serde_json::from_str(&raw)
            .map_err(|e| WardenError::PolicyInvalid(format!("parsing {path:?}: {e}")))?;
        Self::from_file(file, cwd)
    }

    pub fn from_file(file: PolicyFile, cwd: &Path) -> Result<Self, WardenError> {
        if file.allowed_commands.is_empty() {
            return Err(WardenError::PolicyInvalid(
                "allowedCommands must be non-empty".to_string(),
            ));
        }

        let mut allowed_commands = HashSet::with_capacity(file.allowed_commands.len());
        for name in &file.allowed_commands {
            if !is_valid_executable_name(name) {
                return Err(WardenError::PolicyInvalid(format!(
                    "allowedCommands entry '{name}' is not a valid executable name"
                )));
            }
            allowed_commands.insert(name.clone());
        }

        let sandbox_root = resolve_against(cwd, &file.sandbox_root);
        let audit_log_path = resolve_against(&sandbox_root, &file.audit_log_path);

        let blocked_args_regex = compile_all(&file.blocked_args_regex)?;

        let mut dangerous_patterns = Vec::with_capacity(file.dangerous_patterns.len());
        for rule in file.dangerous_patterns {
            dangerous_patterns.push(compile_pattern(rule)?);
        }

        std::fs::create_dir_all(
            audit_log_path
                .parent()
                .unwrap_or_else(|| Path::new(".")),
        )
        .map_err(|e| {
            WardenError::PolicyInvalid(format!("creating audit log directory: {e}"))
        })?;

        Ok(Policy {
            sandbox_root,
            audit_log_path,
            allowed_commands,
            blocked_args_regex,
            dangerous_commands: file.dangerous_commands.into_iter().collect(),
            dangerous_patterns,
            confirm_ttl_seconds: file.confirm_ttl_seconds,
            max_output_chars: file.max_output_chars,
            max_file_read_bytes: file.max_file_read_bytes,
        })
    }
}

fn resolve_against(base: &Path, candidate: &str) -> PathBuf {
    let candidate = Path::new(candidate);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, WardenError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                WardenError::PolicyInvalid(format!("invalid blockedArgsRegex '{p}': {e}"))
            })
        })
        .collect()
}

fn compile_pattern(rule: DangerousPatternFile) -> Result<DangerousPattern, WardenError> {
    let args_regex_any_of = compile_all(&rule.args_regex_any_of)?;
    Ok(DangerousPattern {
        command: rule.command,
        args_any_of: rule.args_any_of.into_iter().collect(),
        args_regex_any_of,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn sample_file() -> PolicyFile {
        PolicyFile {
            sandbox_root: "sandbox".to_string(),
            audit_log_path: "audit.log".to_string(),
            allowed_commands: vec!["ls".to_string(), "rm".to_string()],
            blocked_args_regex: vec![r"^--upload-file$".to_string()],
            dangerous_commands: vec!["rm".to_string()],
            dangerous_patterns: vec![],
            confirm_ttl_seconds: 90,
            max_output_chars: 20_000,
            max_file_read_bytes: 200_000,
        }
    }

    #[test]
    fn rejects_empty_allowed_commands() {
        let mut file = sample_file();
        file.allowed_commands.clear();
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = Policy::from_file(file, tmp.path()).unwrap_err();
        assert!(matches!(err, WardenError::PolicyInvalid(_)));
    }

    #[test]
    fn rejects_malformed_command_name() {
        let mut file = sample_file();
        file.allowed_commands.push("rm -rf".to_string());
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = Policy::from_file(file, tmp.path()).unwrap_err();
        assert!(matches!(err, WardenError::PolicyInvalid(_)));
    }

    #[test]
    fn rejects_uncompilable_regex() {
        let mut file = sample_file();
        file.blocked_args_regex.push("(unclosed".to_string());
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = Policy::from_file(file, tmp.path()).unwrap_err();
        assert!(matches!(err, WardenError::PolicyInvalid(_)));
    }

    #[test]
    fn resolves_relative_paths_against_cwd_and_sandbox_root() {
        let file = sample_file();
        let tmp = tempfile::tempdir().expect("tempdir");
        let policy = Policy::from_file(file, tmp.path()).expect("valid policy");
        assert_eq!(policy.sandbox_root, tmp.path().join("sandbox"));
        assert_eq!(
            policy.audit_log_path,
            tmp.path().join("sandbox").join("audit.log")
        );
        assert!(policy.audit_log_path.parent().expect("parent").is_dir());
    }

    #[test]
    fn absolute_audit_log_path_is_not_rejoined_to_sandbox_root() {
        let mut file = sample_file();
        let tmp = tempfile::tempdir().expect("tempdir");
        let abs = tmp.path().join("elsewhere").join("audit.log");
        file.audit_log_path = abs.to_string_lossy().to_string();
        let policy = Policy::from_file(file, tmp.path()).expect("valid policy");
        assert_eq!(policy.audit_log_path, abs);
    }
}
