//! Refuses destructive operations on filesystem roots and well-known system directories.
//!
//! The guard is an exact-match deny-list: `/etc` is refused but `/etc/nginx` is not.
//! Paths are compared after lexical normalization (absolute, `.`/`..` folded,
//! separators unified, trailing separators dropped, lower-cased). The guard does not
//! follow symlinks, so `/bin` stays `/bin` even where it links to `/usr/bin`.
//! [`resolve`] is the symlink-aware form used to key backups and locks.

use crate::error::{NautilusError, Result};
use std::path::{Component, Path, PathBuf};

/// Normalized forms of the protected locations.
const PROTECTED_PATHS: &[&str] = &[
    "/",
    "c:/",
    "c:/windows",
    "c:/program files",
    "/system",
    "/bin",
    "/usr",
    "/etc",
];

/// Returns true when `path` is exactly one of the protected locations.
pub fn is_dangerous(path: &Path) -> bool {
    let key = guard_key(path);
    PROTECTED_PATHS.contains(&key.as_str())
}

/// Fails with `InvalidTarget` for an empty path or a protected one.
pub fn check_target(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(NautilusError::InvalidTarget {
            path: path.to_path_buf(),
            reason: "no directory selected".to_string(),
        });
    }
    if is_dangerous(path) {
        tracing::warn!(path = %path.display(), "refusing protected directory");
        return Err(NautilusError::InvalidTarget {
            path: path.to_path_buf(),
            reason: "this directory is protected".to_string(),
        });
    }
    Ok(())
}

/// Makes `path` absolute against the current directory and folds `.` and `..`
/// without touching the filesystem.
pub fn absolute(path: &Path) -> PathBuf {
    let joined = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// [`absolute`], with symlinks resolved for the longest prefix of `path` that exists.
///
/// Two spellings of the same directory (`/tmp/x` and `/private/tmp/x`, or a link and
/// its target) resolve to the same path. A path that does not exist at all stays
/// lexical.
pub fn resolve(path: &Path) -> PathBuf {
    let absolute = absolute(path);
    for ancestor in absolute.ancestors() {
        if let Ok(real) = std::fs::canonicalize(ancestor) {
            return match absolute.strip_prefix(ancestor) {
                Ok(rest) if !rest.as_os_str().is_empty() => real.join(rest),
                _ => real,
            };
        }
    }
    absolute
}

/// Splits a leading `X:` drive designator off a `/`-separated path.
fn split_drive(path: &str) -> Option<(char, &str)> {
    let mut chars = path.chars();
    let letter = chars.next()?;
    if letter.is_ascii_alphabetic() && chars.next() == Some(':') {
        Some((letter.to_ascii_lowercase(), &path[2..]))
    } else {
        None
    }
}

fn guard_key(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let raw = if split_drive(&raw).is_some() {
        raw
    } else {
        absolute(path).to_string_lossy().replace('\\', "/")
    };

    let (prefix, rest) = match split_drive(&raw) {
        Some((drive, rest)) => (format!("{drive}:"), rest),
        None => (String::new(), raw.as_str()),
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in rest.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }

    format!("{prefix}/{}", parts.join("/")).to_lowercase()
}
