//! Sandbox path confinement.
//!
//! Confines user-supplied paths to the sandbox root. Resolution is purely
//! lexical: it does not touch the filesystem and therefore does not resolve
//! symbolic links. A symlink inside the sandbox pointing outside of it will
//! still be followed by whatever file I/O consumes the resolved path — a
//! known, accepted weakness; a hardened implementation would canonicalize
//! with `realpath` and re-check containment.

use std::path::{Component, Path, PathBuf};

use warden_protocol::WardenError;

/// Resolve `user_path` against `sandbox_root`, returning an absolute path
/// that is guaranteed to be a (non-strict) descendant of `sandbox_root`.
/// Relative inputs are resolved against `sandbox_root`; absolute inputs are
/// normalized in place. Either way, if the normalized path's relation to
/// `sandbox_root` escapes upward, this returns `PathEscape`.
pub fn resolve_sandbox_path(sandbox_root: &Path, user_path: &str) -> Result<PathBuf, WardenError> {
    let candidate = Path::new(user_path);
    let absolute = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        sandbox_root.join(candidate)
    };

    let normalized = lexically_normalize(&absolute);
    let normalized_root = lexically_normalize(sandbox_root);

    if is_descendant(&normalized, &normalized_root) {
        Ok(normalized)
    } else {
        Err(WardenError::PathEscape(format!(
            "'{user_path}' resolves outside of the sandbox root"
        )))
    }
}

/// Remove `.` and resolve `..` components without touching the filesystem
/// (works even when the path does not exist).
pub fn lexically_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn is_descendant(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}
