/// Undo functionality for reverting a sort.
///
/// Undo clears the directory and copies its snapshot back in, then discards the
/// snapshot. If clearing succeeds but the restore fails, the snapshot is still in
/// place and running undo again recovers the directory.
use crate::backup::BackupStore;
use crate::error::{NautilusError, Result};
use crate::path_guard;
use crate::progress::{ProgressSink, ProgressTracker};
use std::fs;
use std::path::Path;

/// Represents the result of an undo operation.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Number of top-level entries removed before the restore.
    pub removed_entries: usize,
}

/// Restores directories from their snapshots.
pub struct UndoManager;

impl UndoManager {
    /// Returns `dir` to the state captured by its snapshot and deletes the snapshot.
    ///
    /// Every immediate entry of `dir`, files and directories alike, is removed one at
    /// a time, and the rounded share of removed entries is pushed to `progress` after
    /// each removal.
    ///
    /// # Errors
    ///
    /// * `InvalidTarget` if `dir` is empty or a protected path
    /// * `NoBackup` if there is no snapshot; `dir` is left untouched
    /// * `FilesystemError` if `dir` cannot be listed or an entry cannot be removed
    /// * `BackupFailure` if the restore or the snapshot deletion fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nautilus::backup::BackupStore;
    /// use nautilus::progress::NoProgress;
    /// use nautilus::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// let store = BackupStore::default();
    /// match UndoManager::undo(Path::new("/path/to/directory"), &store, &NoProgress) {
    ///     Ok(report) => println!("Cleared {} entries", report.removed_entries),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(
        dir: &Path,
        store: &BackupStore,
        progress: &dyn ProgressSink,
    ) -> Result<UndoReport> {
        path_guard::check_target(dir)?;

        if !store.exists(dir) {
            return Err(NautilusError::NoBackup {
                path: dir.to_path_buf(),
            });
        }
        store.ensure_outside(dir)?;

        let entries = fs::read_dir(dir)
            .map_err(|e| NautilusError::filesystem(dir, e))?
            .map(|entry| {
                entry
                    .map(|e| e.path())
                    .map_err(|e| NautilusError::filesystem(dir, e))
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(dir = %dir.display(), entries = entries.len(), "undoing sort");

        let mut tracker = ProgressTracker::new(entries.len(), progress);
        for path in &entries {
            Self::remove_entry(path)?;
            tracker.advance();
        }

        store.restore(dir)?;
        store.delete(dir)?;

        tracing::info!(dir = %dir.display(), "undo complete");
        Ok(UndoReport {
            removed_entries: entries.len(),
        })
    }

    /// Removes a file, symlink or whole directory tree.
    fn remove_entry(path: &Path) -> Result<()> {
        let metadata =
            fs::symlink_metadata(path).map_err(|e| NautilusError::filesystem(path, e))?;
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        removed.map_err(|e| NautilusError::filesystem(path, e))?;
        tracing::debug!(path = %path.display(), "removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::progress::NoProgress;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TempDir, BackupStore) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let backups = TempDir::new().expect("Failed to create backup root");
        let store = BackupStore::new(backups.path());
        (dir, backups, store)
    }

    #[test]
    fn test_undo_no_backup_leaves_directory_untouched() {
        let (dir, _backups, store) = setup();
        fs::write(dir.path().join("keep.txt"), "keep").unwrap();

        let err = UndoManager::undo(dir.path(), &store, &NoProgress).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoBackup);
        assert_eq!(fs::read_to_string(dir.path().join("keep.txt")).unwrap(), "keep");
    }

    #[test]
    fn test_undo_restores_snapshot_and_deletes_it() {
        let (dir, _backups, store) = setup();
        fs::write(dir.path().join("photo.jpg"), "jpeg").unwrap();
        store.create(dir.path()).unwrap();

        fs::create_dir(dir.path().join("Images")).unwrap();
        fs::rename(dir.path().join("photo.jpg"), dir.path().join("Images/photo.jpg")).unwrap();
        fs::write(dir.path().join("added_later.txt"), "extra").unwrap();

        let report = UndoManager::undo(dir.path(), &store, &NoProgress).expect("Undo failed");

        assert_eq!(report.removed_entries, 2);
        assert_eq!(fs::read_to_string(dir.path().join("photo.jpg")).unwrap(), "jpeg");
        assert!(!dir.path().join("Images").exists());
        assert!(!dir.path().join("added_later.txt").exists());
        assert!(!store.exists(dir.path()));
    }

    #[test]
    fn test_undo_progress_counts_directories() {
        let (dir, _backups, store) = setup();
        store.create(dir.path()).unwrap();
        fs::create_dir(dir.path().join("Images")).unwrap();
        fs::create_dir(dir.path().join("Docs")).unwrap();
        fs::write(dir.path().join("loose.txt"), "x").unwrap();
        fs::write(dir.path().join("other.txt"), "y").unwrap();

        let seen = RefCell::new(Vec::new());
        let sink = |p: u8| seen.borrow_mut().push(p);
        UndoManager::undo(dir.path(), &store, &sink).unwrap();

        assert_eq!(*seen.borrow(), vec![25, 50, 75, 100]);
    }

    #[test]
    fn test_undo_is_single_use() {
        let (dir, _backups, store) = setup();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        store.create(dir.path()).unwrap();

        UndoManager::undo(dir.path(), &store, &NoProgress).unwrap();
        let err = UndoManager::undo(dir.path(), &store, &NoProgress).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NoBackup);
        assert!(dir.path().join("a.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_undo_refuses_backup_inside_linked_source() {
        let data = TempDir::new().unwrap();
        fs::write(data.path().join("precious.txt"), "keep me").unwrap();
        let store = BackupStore::new(data.path().join("bk"));
        let aliases = TempDir::new().unwrap();
        let link = aliases.path().join("link");
        std::os::unix::fs::symlink(data.path(), &link).unwrap();
        // A snapshot that somehow ended up under the directory it belongs to.
        fs::create_dir_all(store.backup_path_for(&link)).unwrap();

        let err = UndoManager::undo(&link, &store, &NoProgress).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BackupFailure);
        assert_eq!(
            fs::read_to_string(data.path().join("precious.txt")).unwrap(),
            "keep me"
        );
        assert!(store.exists(&link));
    }

    #[cfg(unix)]
    #[test]
    fn test_undo_unlinks_symlinks_without_touching_targets() {
        let (dir, _backups, store) = setup();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("target.txt"), "outside").unwrap();
        fs::create_dir(outside.path().join("shared")).unwrap();
        fs::write(outside.path().join("shared/inner.txt"), "inner").unwrap();
        store.create(dir.path()).unwrap();

        std::os::unix::fs::symlink(outside.path().join("target.txt"), dir.path().join("file_link"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path().join("shared"), dir.path().join("dir_link"))
            .unwrap();

        let report = UndoManager::undo(dir.path(), &store, &NoProgress).expect("Undo failed");

        assert_eq!(report.removed_entries, 2);
        assert!(fs::symlink_metadata(dir.path().join("file_link")).is_err());
        assert!(fs::symlink_metadata(dir.path().join("dir_link")).is_err());
        assert_eq!(
            fs::read_to_string(outside.path().join("target.txt")).unwrap(),
            "outside"
        );
        assert_eq!(
            fs::read_to_string(outside.path().join("shared/inner.txt")).unwrap(),
            "inner"
        );
    }

    #[test]
    fn test_undo_rejects_protected_path() {
        let (_dir, _backups, store) = setup();
        let err = UndoManager::undo(Path::new("/usr"), &store, &NoProgress).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
    }
}
