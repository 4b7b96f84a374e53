//! Single-slot snapshots of a directory, used to undo a sort.
//!
//! Each source directory maps to exactly one backup location under a shared root
//! (the OS temp dir unless configured otherwise). Creating a snapshot replaces any
//! previous one for the same source; nothing is ever merged or stacked.

use crate::error::{NautilusError, Result};
use crate::path_guard;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const BACKUP_PREFIX: &str = ".nautilus_backup_";

/// Maps source directories to their snapshot locations and manages those snapshots.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    /// Creates a store that keeps snapshots directly under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory that holds all snapshots of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic snapshot location for `source`.
    ///
    /// The name is the SHA-256 of the resolved source path in URL-safe base64, so it
    /// has the same length however deep `source` is. A link and its target share
    /// one snapshot.
    pub fn backup_path_for(&self, source: &Path) -> PathBuf {
        let resolved = path_guard::resolve(source);
        let digest = Sha256::digest(resolved.as_os_str().as_encoded_bytes());
        self.root.join(format!("{BACKUP_PREFIX}{}", URL_SAFE_NO_PAD.encode(digest)))
    }

    /// Returns true if a snapshot directory exists for `source`.
    pub fn exists(&self, source: &Path) -> bool {
        self.backup_path_for(source).is_dir()
    }

    /// When the snapshot for `source` was last written, if there is one.
    pub fn created_at(&self, source: &Path) -> Option<DateTime<Local>> {
        let metadata = fs::metadata(self.backup_path_for(source)).ok()?;
        metadata.modified().ok().map(DateTime::from)
    }

    /// Copies the full contents of `source` into its snapshot location.
    ///
    /// An existing snapshot, complete or left over from a failed attempt, is deleted first.
    ///
    /// # Errors
    ///
    /// Returns `BackupFailure` naming the offending path if any copy or removal fails,
    /// or if the snapshot location lies inside `source`. A partially written snapshot
    /// is removed again, so a failed create leaves no snapshot behind.
    pub fn create(&self, source: &Path) -> Result<()> {
        let backup_path = self.backup_path_for(source);
        self.ensure_outside(source)?;

        if fs::symlink_metadata(&backup_path).is_ok() {
            tracing::debug!(backup = %backup_path.display(), "replacing previous backup");
            fs::remove_dir_all(&backup_path)
                .map_err(|e| NautilusError::backup(&backup_path, e))?;
        }

        let copied = match copy_recursive(source, &backup_path) {
            Ok(copied) => copied,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&backup_path)
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    tracing::warn!(
                        backup = %backup_path.display(),
                        error = %cleanup,
                        "could not remove partial backup"
                    );
                }
                return Err(e);
            }
        };
        tracing::info!(
            source = %source.display(),
            backup = %backup_path.display(),
            files = copied,
            "backup created"
        );
        Ok(())
    }

    /// Copies the snapshot contents back into `source`.
    ///
    /// Entries already present in `source` with the same names are overwritten;
    /// other entries are left alone. Callers that want an exact restore clear
    /// `source` first.
    ///
    /// # Errors
    ///
    /// Returns `NoBackup` if there is no snapshot, or `BackupFailure` if a copy fails.
    pub fn restore(&self, source: &Path) -> Result<()> {
        let backup_path = self.backup_path_for(source);
        if !backup_path.is_dir() {
            return Err(NautilusError::NoBackup {
                path: source.to_path_buf(),
            });
        }
        let copied = copy_recursive(&backup_path, source)?;
        tracing::info!(source = %source.display(), files = copied, "backup restored");
        Ok(())
    }

    /// Removes the snapshot for `source`. Does nothing if there is none.
    ///
    /// # Errors
    ///
    /// Returns `BackupFailure` if the snapshot exists but cannot be removed.
    pub fn delete(&self, source: &Path) -> Result<()> {
        let backup_path = self.backup_path_for(source);
        if fs::symlink_metadata(&backup_path).is_err() {
            return Ok(());
        }
        fs::remove_dir_all(&backup_path).map_err(|e| NautilusError::backup(&backup_path, e))?;
        tracing::debug!(backup = %backup_path.display(), "backup deleted");
        Ok(())
    }

    /// Fails with `BackupFailure` when the snapshot location lies inside `source`,
    /// where copying or clearing `source` would also reach the snapshot.
    ///
    /// Both sides are compared with symlinks resolved, so a source reached through a
    /// link to an ancestor of the backup root is refused too.
    pub(crate) fn ensure_outside(&self, source: &Path) -> Result<()> {
        let backup_path = self.backup_path_for(source);
        if path_guard::resolve(&backup_path).starts_with(path_guard::resolve(source)) {
            return Err(NautilusError::backup(
                backup_path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "backup location lies inside the source directory",
                ),
            ));
        }
        Ok(())
    }
}

impl Default for BackupStore {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

/// Recursively copies every entry of `src` into `dest`, creating `dest` as needed.
///
/// Symlinks are followed. Returns the number of files copied.
pub(crate) fn copy_recursive(src: &Path, dest: &Path) -> Result<usize> {
    fs::create_dir_all(dest).map_err(|e| NautilusError::backup(dest, e))?;

    let mut copied = 0;
    for entry in fs::read_dir(src).map_err(|e| NautilusError::backup(src, e))? {
        let entry = entry.map_err(|e| NautilusError::backup(src, e))?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());
        let metadata = fs::metadata(&src_path).map_err(|e| NautilusError::backup(&src_path, e))?;

        if metadata.is_dir() {
            copied += copy_recursive(&src_path, &dest_path)?;
        } else {
            fs::copy(&src_path, &dest_path).map_err(|e| NautilusError::backup(&src_path, e))?;
            tracing::debug!(from = %src_path.display(), to = %dest_path.display(), "copied");
            copied += 1;
        }
    }
    Ok(copied)
}
