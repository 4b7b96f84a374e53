//! Public entry points for sorting and undoing.
//!
//! [`Organizer`] ties the guard, the backup store, the sorter and the undo manager
//! together. Each directory is locked for the duration of a sort or undo, so two
//! callers sharing an `Organizer` never interleave operations on the same path.
//! Operations on different directories run independently.
//!
//! The `*_folder`/`undo_sort` methods never fail: every error is turned into an
//! [`OperationOutcome`] carrying a human-readable message.

use crate::backup::BackupStore;
use crate::config::Settings;
use crate::error::Result;
use crate::path_guard;
use crate::progress::ProgressSink;
use crate::rules::{self, Rule};
use crate::sorter::{self, SortReport};
use crate::undo::{UndoManager, UndoReport};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Options for a single sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOptions {
    /// Snapshot the directory before sorting so the sort can be undone.
    pub backup_enabled: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            backup_enabled: true,
        }
    }
}

/// Uniform result of a public operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OperationOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    /// Collapses a typed result, using the error's display text as the message.
    pub fn from_result<T>(result: Result<T>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// Per-directory mutual exclusion.
///
/// Holds an entry only while some caller is running on or waiting for that directory.
#[derive(Debug, Default)]
struct DirectoryLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DirectoryLocks {
    fn key(dir: &Path) -> PathBuf {
        path_guard::resolve(dir)
    }

    /// Runs `operation` while holding the lock for `dir`.
    fn with_lock<T>(&self, dir: &Path, operation: impl FnOnce() -> T) -> T {
        let key = Self::key(dir);
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            operation()
        };

        // Clones are only taken under the map lock, so the count cannot grow here.
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&key);
        }
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Sorts and restores directories against a single backup store.
#[derive(Debug)]
pub struct Organizer {
    store: BackupStore,
    default_options: SortOptions,
    locks: DirectoryLocks,
}

impl Organizer {
    pub fn new(store: BackupStore) -> Self {
        Self {
            store,
            default_options: SortOptions::default(),
            locks: DirectoryLocks::default(),
        }
    }

    /// Builds an organizer from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            store: settings.backup_store(),
            default_options: SortOptions {
                backup_enabled: settings.backup.enabled,
            },
            locks: DirectoryLocks::default(),
        }
    }

    pub fn backup_store(&self) -> &BackupStore {
        &self.store
    }

    /// Options used when the caller does not pass its own.
    pub fn default_options(&self) -> SortOptions {
        self.default_options
    }

    /// Validates `dir`, optionally snapshots it, then sorts it.
    pub fn sort(
        &self,
        dir: &Path,
        rules: &[Rule],
        options: SortOptions,
        progress: &dyn ProgressSink,
    ) -> Result<SortReport> {
        path_guard::check_target(dir)?;
        rules::validate_rules(rules)?;

        self.locks.with_lock(dir, || {
            if options.backup_enabled {
                self.store.create(dir)?;
            }
            sorter::sort(dir, rules, progress)
        })
    }

    /// Restores `dir` from its snapshot and discards the snapshot.
    pub fn undo(&self, dir: &Path, progress: &dyn ProgressSink) -> Result<UndoReport> {
        path_guard::check_target(dir)?;

        self.locks
            .with_lock(dir, || UndoManager::undo(dir, &self.store, progress))
    }

    /// [`Organizer::sort`] with the result collapsed into an [`OperationOutcome`].
    pub fn sort_folder(
        &self,
        dir: &Path,
        rules: &[Rule],
        options: SortOptions,
        progress: &dyn ProgressSink,
    ) -> OperationOutcome {
        let result = self.sort(dir, rules, options, progress);
        if let Err(e) = &result {
            tracing::warn!(dir = %dir.display(), error = %e, "sort failed");
        }
        OperationOutcome::from_result(result)
    }

    /// [`Organizer::undo`] with the result collapsed into an [`OperationOutcome`].
    pub fn undo_sort(&self, dir: &Path, progress: &dyn ProgressSink) -> OperationOutcome {
        let result = self.undo(dir, progress);
        if let Err(e) = &result {
            tracing::warn!(dir = %dir.display(), error = %e, "undo failed");
        }
        OperationOutcome::from_result(result)
    }

    /// Whether `dir` currently has a snapshot to undo to.
    pub fn check_backup(&self, dir: &Path) -> bool {
        self.store.exists(dir)
    }

    /// When the snapshot of `dir` was taken, if there is one.
    pub fn backup_created_at(&self, dir: &Path) -> Option<DateTime<Local>> {
        self.store.created_at(dir)
    }

    /// Runs a sort on a worker thread. Progress arrives on the returned channel.
    pub fn spawn_sort(
        self: &Arc<Self>,
        dir: PathBuf,
        rules: Vec<Rule>,
        options: SortOptions,
    ) -> BackgroundOperation<SortReport> {
        let organizer = Arc::clone(self);
        BackgroundOperation::spawn(move |progress| organizer.sort(&dir, &rules, options, progress))
    }

    /// Runs an undo on a worker thread. Progress arrives on the returned channel.
    pub fn spawn_undo(self: &Arc<Self>, dir: PathBuf) -> BackgroundOperation<UndoReport> {
        let organizer = Arc::clone(self);
        BackgroundOperation::spawn(move |progress| organizer.undo(&dir, progress))
    }
}

/// A sort or undo running on its own thread.
#[derive(Debug)]
pub struct BackgroundOperation<T> {
    /// Progress percentages in emission order. Closes when the operation ends.
    pub progress: Receiver<u8>,
    handle: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> BackgroundOperation<T> {
    fn spawn<F>(operation: F) -> Self
    where
        F: FnOnce(&dyn ProgressSink) -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || operation(&tx));
        Self {
            progress: rx,
            handle,
        }
    }

    /// Waits for the operation to finish. A panic on the worker is resumed here.
    pub fn wait(self) -> Result<T> {
        match self.handle.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }

    /// Waits for the operation and collapses its result into an [`OperationOutcome`].
    pub fn outcome(self) -> OperationOutcome {
        OperationOutcome::from_result(self.wait())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TempDir, Organizer) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let backups = TempDir::new().expect("Failed to create backup root");
        let organizer = Organizer::new(BackupStore::new(backups.path()));
        (dir, backups, organizer)
    }

    fn rules() -> Vec<Rule> {
        vec![Rule::new("Images").with_extensions([".jpg"])]
    }

    #[test]
    fn test_sort_folder_with_backup_enables_undo() {
        let (dir, _backups, organizer) = setup();
        fs::write(dir.path().join("a.jpg"), "a").unwrap();

        let outcome =
            organizer.sort_folder(dir.path(), &rules(), SortOptions::default(), &NoProgress);

        assert_eq!(outcome, OperationOutcome::ok());
        assert!(organizer.check_backup(dir.path()));
        assert!(organizer.backup_created_at(dir.path()).is_some());
    }

    #[test]
    fn test_sort_folder_without_backup() {
        let (dir, _backups, organizer) = setup();
        fs::write(dir.path().join("a.jpg"), "a").unwrap();

        let outcome = organizer.sort_folder(
            dir.path(),
            &rules(),
            SortOptions {
                backup_enabled: false,
            },
            &NoProgress,
        );

        assert!(outcome.success);
        assert!(!organizer.check_backup(dir.path()));
        assert!(dir.path().join("Images/a.jpg").exists());
    }

    #[test]
    fn test_failures_become_messages() {
        let (_dir, _backups, organizer) = setup();

        let outcome =
            organizer.sort_folder(Path::new("/"), &rules(), SortOptions::default(), &NoProgress);
        assert!(!outcome.success);
        assert!(outcome.message.unwrap().contains("protected"));

        let outcome = organizer.undo_sort(Path::new("/tmp/never-sorted"), &NoProgress);
        assert!(!outcome.success);
        assert!(outcome.message.unwrap().contains("No backup"));
    }

    #[test]
    fn test_invalid_rules_do_not_create_backup() {
        let (dir, _backups, organizer) = setup();
        let bad = vec![Rule::new("").with_extensions([".jpg"])];

        let outcome =
            organizer.sort_folder(dir.path(), &bad, SortOptions::default(), &NoProgress);

        assert!(!outcome.success);
        assert!(!organizer.check_backup(dir.path()));
    }

    #[test]
    fn test_outcome_serializes_like_ipc_result() {
        let json = serde_json::to_string(&OperationOutcome::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);
        let json = serde_json::to_string(&OperationOutcome::failure("boom")).unwrap();
        assert_eq!(json, r#"{"success":false,"message":"boom"}"#);
    }

    #[test]
    fn test_from_settings_uses_configured_defaults() {
        let mut settings = Settings::default();
        settings.backup.enabled = false;
        settings.backup.directory = Some(PathBuf::from("/var/tmp/snapshots"));

        let organizer = Organizer::from_settings(&settings);

        assert!(!organizer.default_options().backup_enabled);
        assert_eq!(organizer.backup_store().root(), Path::new("/var/tmp/snapshots"));
    }

    #[test]
    fn test_spawn_sort_reports_progress_and_outcome() {
        let (dir, _backups, organizer) = setup();
        fs::write(dir.path().join("a.jpg"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        let organizer = Arc::new(organizer);

        let operation =
            organizer.spawn_sort(dir.path().to_path_buf(), rules(), SortOptions::default());
        let progress: Vec<u8> = operation.progress.iter().collect();
        let report = operation.wait().expect("Sort failed");

        assert_eq!(report.moved.len(), 1);
        assert_eq!(report.unmatched, 1);
        assert_eq!(progress, vec![50, 100]);
    }

    #[test]
    fn test_spawn_undo_outcome() {
        let (dir, _backups, organizer) = setup();
        let organizer = Arc::new(organizer);

        let outcome = organizer.spawn_undo(dir.path().to_path_buf()).outcome();

        assert!(!outcome.success);
        assert!(outcome.message.unwrap().contains("No backup"));
    }

    #[test]
    fn test_locks_are_keyed_by_normalized_path() {
        assert_eq!(
            DirectoryLocks::key(Path::new("/data/photos")),
            DirectoryLocks::key(Path::new("/data/./photos/"))
        );
        assert_ne!(
            DirectoryLocks::key(Path::new("/data/photos")),
            DirectoryLocks::key(Path::new("/data/music"))
        );
    }

    #[test]
    fn test_lock_entries_are_released_after_use() {
        let locks = DirectoryLocks::default();

        let seen_inside = locks.with_lock(Path::new("/data/photos"), || {
            locks.with_lock(Path::new("/data/music"), || locks.len())
        });

        assert_eq!(seen_inside, 2);
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn test_organizer_keeps_no_locks_between_operations() {
        let (dir, _backups, organizer) = setup();
        fs::write(dir.path().join("a.jpg"), "a").unwrap();
        let organizer = Arc::new(organizer);

        let first = organizer.spawn_sort(dir.path().to_path_buf(), rules(), SortOptions::default());
        let second = organizer.spawn_undo(dir.path().to_path_buf());
        first.wait().expect("Sort failed");
        let _ = second.wait();
        organizer.undo_sort(dir.path(), &NoProgress);

        assert_eq!(organizer.locks.len(), 0);
    }

    #[test]
    fn test_concurrent_operations_on_same_directory_serialize() {
        let (dir, _backups, organizer) = setup();
        for i in 0..20 {
            fs::write(dir.path().join(format!("img_{i}.jpg")), "x").unwrap();
        }
        let organizer = Arc::new(organizer);

        let first = organizer.spawn_sort(dir.path().to_path_buf(), rules(), SortOptions::default());
        let second =
            organizer.spawn_sort(dir.path().to_path_buf(), rules(), SortOptions::default());

        let first = first.wait().expect("First sort failed");
        let second = second.wait().expect("Second sort failed");

        assert_eq!(first.moved.len() + second.moved.len(), 20);
        assert_eq!(fs::read_dir(dir.path().join("Images")).unwrap().count(), 20);
    }
}
