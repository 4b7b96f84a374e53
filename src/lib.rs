//! nautilus - sort a directory into rule-based sub-folders, and undo it
//!
//! This library classifies the files of a directory with an ordered list of
//! user rules (by extension and/or keyword), moves them into one sub-folder per
//! rule, and keeps a single snapshot per directory so a sort can be undone.
//! Protected system directories are refused before anything is touched.

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod organizer;
pub mod output;
pub mod path_guard;
pub mod progress;
pub mod rule_store;
pub mod rules;
pub mod sorter;
pub mod undo;

pub use backup::BackupStore;
pub use config::{ConfigError, Settings};
pub use error::{ErrorKind, NautilusError, Result};
pub use organizer::{BackgroundOperation, OperationOutcome, Organizer, SortOptions};
pub use progress::{NoProgress, ProgressSink};
pub use rule_store::RuleStore;
pub use rules::{Rule, match_rule};
pub use sorter::{MovedFile, PlannedMove, SortReport};
pub use undo::{UndoManager, UndoReport};

pub use cli::{Cli, run_cli};
