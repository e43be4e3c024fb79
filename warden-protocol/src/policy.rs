use serde::{Deserialize, Serialize};

/// Raw, on-disk shape of the policy file. Unknown keys are ignored by
/// `serde` so the format stays forward-compatible; the loader in
/// `warden-core::policy` is responsible for resolving paths against
/// `sandboxRoot`/the working directory and compiling `blockedArgsRegex` and
/// `dangerousPatterns[].argsRegexAnyOf` into live `Regex` values, producing
/// the validated runtime `Policy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyFile {
    pub sandbox_root: String,
    pub audit_log_path: String,
    pub allowed_commands: Vec<String>,
    #[serde(default)]
    pub blocked_args_regex: Vec<String>,
    #[serde(default)]
    pub dangerous_commands: Vec<String>,
    #[serde(default)]
    pub dangerous_patterns: Vec<DangerousPatternFile>,
    #[serde(default = "default_confirm_ttl_seconds")]
    pub confirm_ttl_seconds: u64,
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
    #[serde(default = "default_max_file_read_bytes")]
    pub max_file_read_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DangerousPatternFile {
    pub command: String,
    #[serde(default)]
    pub args_any_of: Vec<String>,
    #[serde(default)]
    pub args_regex_any_of: Vec<String>,
}

pub fn default_confirm_ttl_seconds() -> u64 {
    90
}

pub fn default_max_output_chars() -> usize {
    20_000
}

pub fn default_max_file_read_bytes() -> usize {
    200_000
}
