//! Error kinds shared by the sort, undo and backup operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while sorting, undoing or snapshotting a directory.
#[derive(Debug, Error)]
pub enum NautilusError {
    /// The target directory is missing, empty or a protected system path.
    #[error("Invalid target {}: {reason}", path.display())]
    InvalidTarget { path: PathBuf, reason: String },

    /// Undo was requested but no snapshot exists for the directory.
    #[error("No backup found for {}", path.display())]
    NoBackup { path: PathBuf },

    /// A copy or remove failed while creating, restoring or deleting a snapshot.
    #[error("Backup failure at {}: {source}", path.display())]
    BackupFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be moved into its rule folder.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    MoveFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic read/list/stat/remove failure.
    #[error("Filesystem error at {}: {source}", path.display())]
    FilesystemError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rule would steer files somewhere it must not (bad folder name, malformed extension).
    #[error("Invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },
}

/// Discriminant of [`NautilusError`], handy for matching without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidTarget,
    NoBackup,
    BackupFailure,
    MoveFailure,
    FilesystemError,
    InvalidRule,
}

impl NautilusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTarget { .. } => ErrorKind::InvalidTarget,
            Self::NoBackup { .. } => ErrorKind::NoBackup,
            Self::BackupFailure { .. } => ErrorKind::BackupFailure,
            Self::MoveFailure { .. } => ErrorKind::MoveFailure,
            Self::FilesystemError { .. } => ErrorKind::FilesystemError,
            Self::InvalidRule { .. } => ErrorKind::InvalidRule,
        }
    }

    pub(crate) fn backup(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::BackupFailure {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FilesystemError {
            path: path.into(),
            source,
        }
    }
}

/// Result type for sort, undo and backup operations.
pub type Result<T> = std::result::Result<T, NautilusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let err = NautilusError::NoBackup {
            path: PathBuf::from("/tmp/x"),
        };
        assert_eq!(err.kind(), ErrorKind::NoBackup);

        let err = NautilusError::backup(
            "/tmp/backup",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::BackupFailure);
    }

    #[test]
    fn test_message_names_offending_path() {
        let err = NautilusError::MoveFailure {
            from: PathBuf::from("/data/a.jpg"),
            to: PathBuf::from("/data/Images/a.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists"),
        };
        let message = err.to_string();
        assert!(message.contains("/data/a.jpg"));
        assert!(message.contains("/data/Images/a.jpg"));
        assert!(message.contains("exists"));
    }
}
