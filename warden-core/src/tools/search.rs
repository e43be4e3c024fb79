//! The `search` and `find_files` tools: bounded, iterative directory walks
//! confined to the sandbox root, skipping the usual noise directories and
//! anything too large to be worth reading.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use serde::Deserialize;

use warden_protocol::{AuditEvent, ToolResponse, WardenError};

use crate::path_resolver::resolve_sandbox_path;

use super::context::ToolContext;

const SKIPPED_DIRS: [&str; 4] = [".git", "node_modules", ".mcp-audit", "dist"];
const MAX_SEARCHABLE_FILE_BYTES: u64 = 1024 * 1024;

fn default_max_matches() -> usize {
    50
}

fn default_max_results() -> usize {
    50
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchArgs {
    pub query: String,
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindFilesArgs {
    #[serde(default = "default_dir")]
    pub dir: String,
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    #[serde(default)]
    pub name_contains: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub modified_within_minutes: Option<u64>,
    #[serde(default)]
    pub follow_symlinks: Option<bool>,
}

fn default_dir() -> String {
    ".".to_string()
}

pub async fn search(ctx: &ToolContext, request: SearchArgs) -> Result<ToolResponse, WardenError> {
    let root = ctx.policy.sandbox_root.clone();
    let mut matches = Vec::new();
    let mut stack = vec![root.clone()];

    'outer: while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                let name = entry.file_name();
                if SKIPPED_DIRS.iter().any(|skip| name == *skip) {
                    continue;
                }
                stack.push(path);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if metadata.len() > MAX_SEARCHABLE_FILE_BYTES {
                continue;
            }
            let Ok(content) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            if content.contains(&request.query) {
                let rel = path.strip_prefix(&root).unwrap_or(&path);
                matches.push(rel.display().to_string());
                if matches.len() >= request.max_matches {
                    break 'outer;
                }
            }
        }
    }

    ctx.audit
        .append(AuditEvent::Search {
            path: root.display().to_string(),
            matches: matches.len(),
        })
        .await;
    let text = if matches.is_empty() {
        "(no matches)".to_string()
    } else {
        matches.join("\n")
    };
    Ok(ToolResponse::text(text))
}

pub async fn find_files(ctx: &ToolContext, request: FindFilesArgs) -> Result<ToolResponse, WardenError> {
    let root = resolve_sandbox_path(&ctx.policy.sandbox_root, &request.dir)?;
    let extensions: Option<HashSet<String>> = request.extensions.map(|exts| {
        exts.into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect()
    });
    let name_contains = request.name_contains.map(|s| s.to_lowercase());
    let follow_symlinks = request.follow_symlinks.unwrap_or(true);
    let cutoff = request
        .modified_within_minutes
        .and_then(|minutes| SystemTime::now().checked_sub(Duration::from_secs(minutes * 60)));

    let mut results: Vec<(PathBuf, SystemTime)> = Vec::new();
    let mut visited_inodes: HashSet<u64> = HashSet::new();
    let mut stack = vec![root.clone()];

    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };

            if file_type.is_symlink() {
                if !follow_symlinks {
                    continue;
                }
                let Ok(target_meta) = tokio::fs::metadata(&path).await else {
                    continue;
                };
                if target_meta.is_dir() {
                    if dir_already_visited(&target_meta, &mut visited_inodes) {
                        continue;
                    }
                    stack.push(path);
                    continue;
                }
                if target_meta.is_file() {
                    consider_file(&path, &target_meta, &extensions, &name_contains, cutoff, &mut results);
                }
                continue;
            }

            if file_type.is_dir() {
                let name = entry.file_name();
                if SKIPPED_DIRS.iter().any(|skip| name == *skip) {
                    continue;
                }
                stack.push(path);
                continue;
            }

            if file_type.is_file() {
                let Ok(metadata) = entry.metadata().await else {
                    continue;
                };
                consider_file(&path, &metadata, &extensions, &name_contains, cutoff, &mut results);
            }
        }
    }

    results.sort_by(|a, b| b.1.cmp(&a.1));
    results.truncate(request.max_results);

    ctx.audit
        .append(AuditEvent::FindFiles {
            path: root.display().to_string(),
            matches: results.len(),
        })
        .await;

    let text = if results.is_empty() {
        "(no files found)".to_string()
    } else {
        results
            .iter()
            .map(|(path, _)| {
                path.strip_prefix(&ctx.policy.sandbox_root)
                    .unwrap_or(path)
                    .display()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    Ok(ToolResponse::text(text))
}

/// Cycle protection for followed symlinked directories, keyed by inode on
/// Unix. On non-Unix targets there is no cheap stable identity for a
/// directory short of canonicalizing every step, so cycle protection is
/// skipped there and a pathological symlink ring can loop; that tradeoff
/// is accepted rather than paying for `canonicalize` on every directory.
#[cfg(unix)]
fn dir_already_visited(metadata: &std::fs::Metadata, visited: &mut HashSet<u64>) -> bool {
    use std::os::unix::fs::MetadataExt;
    !visited.insert(metadata.ino())
}

#[cfg(not(unix))]
fn dir_already_visited(_metadata: &std::fs::Metadata, _visited: &mut HashSet<u64>) -> bool {
    false
}

fn consider_file(
    path: &std::path::Path,
    metadata: &std::fs::Metadata,
    extensions: &Option<HashSet<String>>,
    name_contains: &Option<String>,
    cutoff: Option<SystemTime>,
    results: &mut Vec<(PathBuf, SystemTime)>,
) {
    if let Some(extensions) = extensions {
        let matches_extension = path
            .extension()
            .map(|ext| extensions.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false);
        if !matches_extension {
            return;
        }
    }
    if let Some(name_contains) = name_contains {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !file_name.contains(name_contains.as_str()) {
            return;
        }
    }
    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    if let Some(cutoff) = cutoff {
        if modified < cutoff {
            return;
        }
    }
    results.push((path.to_path_buf(), modified));
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::confirm::ConfirmationStore;
    use crate::{AuditSink, Policy};
    use std::collections::HashSet as StdHashSet;
    use std::sync::Arc;

    async fn context(sandbox_root: std::path::PathBuf) -> ToolContext {
        std::fs::create_dir_all(&sandbox_root).expect("mkdir sandbox");
        let audit_log_path = sandbox_root.join("audit.log");
        let policy = Policy {
            sandbox_root,
            audit_log_path: audit_log_path.clone(),
            allowed_commands: StdHashSet::from(["echo".to_string()]),
            blocked_args_regex: vec![],
            dangerous_commands: StdHashSet::new(),
            dangerous_patterns: vec![],
            confirm_ttl_seconds: 90,
            max_output_chars: 20_000,
            max_file_read_bytes: 200_000,
        };
        let audit = AuditSink::open(&audit_log_path).await.expect("open audit");
        ToolContext::new(
            Arc::new(policy),
            Arc::new(audit),
            Arc::new(ConfirmationStore::new(90)),
        )
    }

    #[tokio::test]
    async fn search_finds_a_literal_substring() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let sandbox_root = tmp.path().join("sandbox");
        let ctx = context(sandbox_root.clone()).await;
        tokio::fs::write(sandbox_root.join("a.txt"), "needle in a haystack")
            .await
            .expect("write");
        tokio::fs::write(sandbox_root.join("b.txt"), "nothing here")
            .await
            .expect("write");
        let response = search(
            &ctx,
            SearchArgs {
                query: "needle".to_string(),
                max_matches: 10,
            },
        )
        .await
        .expect("search succeeds");
        assert_eq!(response.joined_text(), "a.txt");
    }

    #[tokio::test]
    async fn search_skips_noise_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let sandbox_root = tmp.path().join("sandbox");
        let ctx = context(sandbox_root.clone()).await;
        tokio::fs::create_dir_all(sandbox_root.join("node_modules"))
            .await
            .expect("mkdir");
        tokio::fs::write(sandbox_root.join("node_modules/dep.txt"), "needle")
            .await
            .expect("write");
        let response = search(
            &ctx,
            SearchArgs {
                query: "needle".to_string(),
                max_matches: 10,
            },
        )
        .await
        .expect("search succeeds");
        assert_eq!(response.joined_text(), "(no matches)");
    }

    #[tokio::test]
    async fn find_files_filters_by_extension() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let sandbox_root = tmp.path().join("sandbox");
        let ctx = context(sandbox_root.clone()).await;
        tokio::fs::write(sandbox_root.join("a.rs"), "fn main() {}")
            .await
            .expect("write");
        tokio::fs::write(sandbox_root.join("b.txt"), "text")
            .await
            .expect("write");
        let response = find_files(
            &ctx,
            FindFilesArgs {
                dir: ".".to_string(),
                extensions: Some(vec!["rs".to_string()]),
                name_contains: None,
                max_results: 50,
                modified_within_minutes: None,
                follow_symlinks: None,
            },
        )
        .await
        .expect("find_files succeeds");
        assert_eq!(response.joined_text(), "a.rs");
    }

    #[tokio::test]
    async fn find_files_respects_max_results() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let sandbox_root = tmp.path().join("sandbox");
        let ctx = context(sandbox_root.clone()).await;
        for i in 0..5 {
            tokio::fs::write(sandbox_root.join(format!("f{i}.txt")), "x")
                .await
                .expect("write");
        }
        let response = find_files(
            &ctx,
            FindFilesArgs {
                dir: ".".to_string(),
                extensions: None,
                name_contains: None,
                max_results: 2,
                modified_within_minutes: None,
                follow_symlinks: None,
            },
        )
        .await
        .expect("find_files succeeds");
        assert_eq!(response.joined_text().lines().count(), 2);
    }
}
