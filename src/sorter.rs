/// Moves the files of a directory into rule-named sub-folders.
///
/// Only the immediate plain files of the target directory are considered; existing
/// sub-directories are neither inspected nor moved. Each file goes to the folder of
/// the first matching rule, files without a match stay where they are.
use crate::error::{NautilusError, Result};
use crate::path_guard;
use crate::progress::{ProgressSink, ProgressTracker};
use crate::rules::{self, Rule};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// A file that was moved into a rule folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    /// The path of the file before sorting.
    pub original_path: PathBuf,
    /// The path of the file inside its rule folder.
    pub new_path: PathBuf,
    /// The rule (and folder) name the file was sorted into.
    pub rule_name: String,
}

/// Outcome of a completed sort.
#[derive(Debug, Default)]
pub struct SortReport {
    /// Files moved, in processing order.
    pub moved: Vec<MovedFile>,
    /// Number of plain files no rule matched.
    pub unmatched: usize,
}

impl SortReport {
    /// Total number of plain files that were examined.
    pub fn total_processed(&self) -> usize {
        self.moved.len() + self.unmatched
    }
}

/// A move that a sort would perform, computed without touching the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub file_name: String,
    pub rule_name: String,
}

/// Sorts the plain files of `dir` into sub-folders named after the first matching rule.
///
/// After each file is processed, matched or not, the rounded share of processed
/// files is pushed to `progress`. A directory without plain files emits nothing.
///
/// A move never overwrites: if the destination already holds an entry with the same
/// name the sort stops with `MoveFailure`. Files moved before a failure stay moved.
///
/// # Errors
///
/// * `InvalidTarget` if `dir` is empty or a protected path
/// * `InvalidRule` if a rule could place files outside `dir`
/// * `FilesystemError` if `dir` cannot be listed or a rule folder cannot be created
/// * `MoveFailure` if a file cannot be moved
///
/// # Examples
///
/// ```no_run
/// use nautilus::progress::NoProgress;
/// use nautilus::rules::Rule;
/// use nautilus::sorter;
/// use std::path::Path;
///
/// let rules = vec![Rule::new("Images").with_extensions([".jpg", ".png"])];
/// match sorter::sort(Path::new("/path/to/Downloads"), &rules, &NoProgress) {
///     Ok(report) => println!("Moved {} files", report.moved.len()),
///     Err(e) => eprintln!("Sort failed: {}", e),
/// }
/// ```
pub fn sort(dir: &Path, rules: &[Rule], progress: &dyn ProgressSink) -> Result<SortReport> {
    path_guard::check_target(dir)?;
    rules::validate_rules(rules)?;

    let files = list_plain_files(dir)?;
    tracing::info!(dir = %dir.display(), files = files.len(), rules = rules.len(), "sorting");

    let mut tracker = ProgressTracker::new(files.len(), progress);
    let mut report = SortReport::default();

    for (file_name, file_path) in files {
        match rules::match_rule(&file_name.to_string_lossy(), rules) {
            Some(rule) => {
                let moved = move_into_folder(dir, &file_path, &file_name, &rule.name)?;
                report.moved.push(moved);
            }
            None => report.unmatched += 1,
        }
        tracker.advance();
    }

    tracing::info!(
        dir = %dir.display(),
        moved = report.moved.len(),
        unmatched = report.unmatched,
        "sort complete"
    );
    Ok(report)
}

/// Computes the moves [`sort`] would perform, in the same order, without changing anything.
///
/// # Errors
///
/// Same validation and listing errors as [`sort`].
pub fn plan(dir: &Path, rules: &[Rule]) -> Result<Vec<PlannedMove>> {
    path_guard::check_target(dir)?;
    rules::validate_rules(rules)?;

    let planned = list_plain_files(dir)?
        .into_iter()
        .filter_map(|(file_name, _)| {
            let file_name = file_name.to_string_lossy().into_owned();
            rules::match_rule(&file_name, rules).map(|rule| PlannedMove {
                rule_name: rule.name.clone(),
                file_name,
            })
        })
        .collect();
    Ok(planned)
}

/// Lists the immediate plain files of `dir` in directory-listing order.
///
/// Symlinks count as files when they point at one.
fn list_plain_files(dir: &Path) -> Result<Vec<(OsString, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|e| NautilusError::filesystem(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| NautilusError::filesystem(dir, e))?;
        let path = entry.path();
        let metadata = fs::metadata(&path).map_err(|e| NautilusError::filesystem(&path, e))?;
        if metadata.is_file() {
            files.push((entry.file_name(), path));
        }
    }
    Ok(files)
}

/// Moves `file_path` into `base_path/folder`, creating the folder if it does not exist.
///
/// An existing folder is reused as is.
fn move_into_folder(
    base_path: &Path,
    file_path: &Path,
    file_name: &OsString,
    folder: &str,
) -> Result<MovedFile> {
    let folder_path = base_path.join(folder);

    if !folder_path.is_dir() {
        fs::create_dir(&folder_path).map_err(|e| NautilusError::filesystem(&folder_path, e))?;
        tracing::debug!(folder = %folder_path.display(), "created rule folder");
    }

    let destination = folder_path.join(file_name);

    // rename() silently replaces an existing file on Unix.
    if fs::symlink_metadata(&destination).is_ok() {
        return Err(NautilusError::MoveFailure {
            from: file_path.to_path_buf(),
            to: destination,
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "destination already exists",
            ),
        });
    }

    fs::rename(file_path, &destination).map_err(|e| NautilusError::MoveFailure {
        from: file_path.to_path_buf(),
        to: destination.clone(),
        source: e,
    })?;
    tracing::debug!(from = %file_path.display(), to = %destination.display(), "moved");

    Ok(MovedFile {
        original_path: file_path.to_path_buf(),
        new_path: destination,
        rule_name: folder.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::progress::NoProgress;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn example_rules() -> Vec<Rule> {
        vec![
            Rule::new("Images").with_extensions([".jpg", ".png"]),
            Rule::new("Docs").with_keywords(["invoice"]),
        ]
    }

    #[test]
    fn test_sort_creates_rule_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::write(base_path.join("photo.jpg"), "jpeg").expect("Failed to write test file");

        let report = sort(base_path, &example_rules(), &NoProgress).expect("Sort failed");

        assert!(base_path.join("Images").is_dir());
        assert!(base_path.join("Images/photo.jpg").is_file());
        assert!(!base_path.join("photo.jpg").exists());
        assert_eq!(report.moved.len(), 1);
        assert_eq!(report.moved[0].rule_name, "Images");
    }

    #[test]
    fn test_sort_reuses_existing_folder() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Images")).unwrap();
        fs::write(base_path.join("Images/already.png"), "png").unwrap();
        fs::write(base_path.join("new.png"), "png").unwrap();

        sort(base_path, &example_rules(), &NoProgress).expect("Sort failed");

        assert!(base_path.join("Images/already.png").is_file());
        assert!(base_path.join("Images/new.png").is_file());
    }

    #[test]
    fn test_sort_leaves_unmatched_files_and_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();
        fs::write(base_path.join("notes.txt"), "notes").unwrap();
        fs::create_dir(base_path.join("holiday.jpg")).unwrap();

        let report = sort(base_path, &example_rules(), &NoProgress).unwrap();

        assert_eq!(report.unmatched, 1);
        assert!(report.moved.is_empty());
        assert!(base_path.join("notes.txt").is_file());
        assert!(base_path.join("holiday.jpg").is_dir());
        assert!(!base_path.join("Images").exists());
    }

    #[test]
    fn test_sort_progress_counts_only_files() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();
        fs::write(base_path.join("a.jpg"), "a").unwrap();
        fs::write(base_path.join("b.txt"), "b").unwrap();
        fs::create_dir(base_path.join("folder")).unwrap();

        let seen = RefCell::new(Vec::new());
        let sink = |p: u8| seen.borrow_mut().push(p);
        sort(base_path, &example_rules(), &sink).unwrap();

        assert_eq!(*seen.borrow(), vec![50, 100]);
    }

    #[test]
    fn test_sort_empty_directory_emits_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let seen = RefCell::new(Vec::new());
        let sink = |p: u8| seen.borrow_mut().push(p);

        let report = sort(temp_dir.path(), &example_rules(), &sink).unwrap();

        assert_eq!(report.total_processed(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_sort_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Images")).unwrap();
        fs::write(base_path.join("Images/photo.jpg"), "old").unwrap();
        fs::write(base_path.join("photo.jpg"), "new").unwrap();

        let err = sort(base_path, &example_rules(), &NoProgress).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MoveFailure);
        assert_eq!(
            fs::read_to_string(base_path.join("Images/photo.jpg")).unwrap(),
            "old"
        );
        assert_eq!(fs::read_to_string(base_path.join("photo.jpg")).unwrap(), "new");
    }

    #[test]
    fn test_sort_rejects_invalid_rule() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.jpg"), "a").unwrap();
        let rules = vec![Rule::new("../escape").with_extensions([".jpg"])];

        let err = sort(temp_dir.path(), &rules, &NoProgress).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidRule);
        assert!(temp_dir.path().join("a.jpg").exists());
    }

    #[test]
    fn test_sort_rejects_protected_and_empty_paths() {
        let err = sort(Path::new("/etc"), &example_rules(), &NoProgress).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
        let err = sort(Path::new(""), &example_rules(), &NoProgress).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
    }

    #[test]
    fn test_sort_missing_directory() {
        let err = sort(Path::new("/non/existent/path"), &example_rules(), &NoProgress)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FilesystemError);
    }

    #[test]
    fn test_plan_does_not_touch_files() {
        let temp_dir = TempDir::new().unwrap();
        let base_path = temp_dir.path();
        fs::write(base_path.join("photo.jpg"), "a").unwrap();
        fs::write(base_path.join("invoice_march.txt"), "b").unwrap();
        fs::write(base_path.join("notes.txt"), "c").unwrap();

        let mut planned = plan(base_path, &example_rules()).unwrap();
        planned.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        assert_eq!(
            planned,
            vec![
                PlannedMove {
                    file_name: "invoice_march.txt".to_string(),
                    rule_name: "Docs".to_string(),
                },
                PlannedMove {
                    file_name: "photo.jpg".to_string(),
                    rule_name: "Images".to_string(),
                },
            ]
        );
        assert!(base_path.join("photo.jpg").exists());
        assert!(!base_path.join("Images").exists());
    }
}
