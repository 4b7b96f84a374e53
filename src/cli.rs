//! Command-line interface module for nautilus.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing
//! - Sort and dry-run orchestration
//! - Undo and backup status
//! - Rule list management

use crate::config::Settings;
use crate::organizer::{Organizer, SortOptions};
use crate::output::OutputFormatter;
use crate::rules::{self, Rule};
use crate::sorter;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sort a directory's files into rule-based sub-folders, with one-step undo.
#[derive(Debug, Parser)]
#[command(name = "nautilus", version, about)]
pub struct Cli {
    /// Settings file (TOML). Defaults to .nautilusrc.toml, then ~/.config/nautilus/config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Represents a CLI command to execute.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move the files of a directory into rule folders.
    Sort {
        /// Directory to sort.
        dir: PathBuf,
        #[command(flatten)]
        rules: RulesArg,
        /// Do not snapshot the directory first (the sort cannot be undone).
        #[arg(long)]
        no_backup: bool,
        /// Show what would be moved without changing anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Restore a directory to its state before the last sort.
    Undo {
        /// Directory to restore.
        dir: PathBuf,
    },
    /// Show whether a directory has a backup to undo to.
    Status {
        /// Directory to inspect.
        dir: PathBuf,
    },
    /// Manage the rule list.
    #[command(subcommand)]
    Rules(RulesCommand),
}

#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    /// Print the rules in match order.
    List {
        #[command(flatten)]
        rules: RulesArg,
    },
    /// Write the built-in default rules to the rule store.
    Init {
        #[command(flatten)]
        rules: RulesArg,
        /// Overwrite an existing rule store.
        #[arg(long)]
        force: bool,
    },
    /// Append a rule. It is matched after all existing rules.
    Add {
        /// Folder name, also used to identify the rule.
        #[arg(long)]
        name: String,
        /// Extension including the dot, e.g. ".jpg". Repeatable.
        #[arg(long = "ext")]
        extensions: Vec<String>,
        /// Case-insensitive substring of the file name. Repeatable.
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        #[command(flatten)]
        rules: RulesArg,
    },
    /// Remove every rule with the given name.
    Remove {
        name: String,
        #[command(flatten)]
        rules: RulesArg,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RulesArg {
    /// Rule store (JSON). Defaults to the settings value or ~/.config/nautilus/rules.json.
    #[arg(long = "rules")]
    pub path: Option<PathBuf>,
}

/// Runs the CLI application with already-parsed arguments.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use nautilus::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["nautilus", "sort", "/path/to/Downloads", "--dry-run"]);
/// if let Err(e) = run_cli(cli) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: Cli) -> Result<(), String> {
    let settings = Settings::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    run_with_settings(cli.command, &settings)
}

/// Runs a command against explicit settings.
pub fn run_with_settings(command: Command, settings: &Settings) -> Result<(), String> {
    let organizer = Arc::new(Organizer::from_settings(settings));

    match command {
        Command::Sort {
            dir,
            rules,
            no_backup,
            dry_run,
        } => {
            let rule_list = load_rules(settings, &rules)?;
            if dry_run {
                sort_dry_run(&dir, &rule_list)
            } else {
                let options = SortOptions {
                    backup_enabled: organizer.default_options().backup_enabled && !no_backup,
                };
                sort_directory(&organizer, dir, rule_list, options)
            }
        }
        Command::Undo { dir } => undo_directory(&organizer, dir),
        Command::Status { dir } => {
            show_status(&organizer, &dir);
            Ok(())
        }
        Command::Rules(command) => run_rules_command(command, settings),
    }
}

fn load_rules(settings: &Settings, rules: &RulesArg) -> Result<Vec<Rule>, String> {
    settings
        .rule_store(rules.path.as_deref())
        .load()
        .map_err(|e| format!("Error loading rules: {}", e))
}

/// Sorts `dir` on a worker thread while the progress bar follows along.
fn sort_directory(
    organizer: &Arc<Organizer>,
    dir: PathBuf,
    rule_list: Vec<Rule>,
    options: SortOptions,
) -> Result<(), String> {
    OutputFormatter::info(&format!("Sorting contents of: {}", dir.display()));

    let operation = organizer.spawn_sort(dir.clone(), rule_list, options);
    OutputFormatter::follow_progress("sorting", &operation.progress);
    let report = operation.wait().map_err(|e| e.to_string())?;

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for moved in &report.moved {
        *counts.entry(moved.rule_name.clone()).or_insert(0) += 1;
    }
    OutputFormatter::summary_table(&counts, report.unmatched);

    OutputFormatter::success("Sort complete!");
    if options.backup_enabled {
        OutputFormatter::plain(&format!(
            "Backup saved. Use 'nautilus undo {}' to revert changes.",
            dir.display()
        ));
    } else {
        OutputFormatter::warning("No backup was made; this sort cannot be undone.");
    }
    Ok(())
}

/// Shows what a sort would do without touching the directory.
fn sort_dry_run(dir: &Path, rule_list: &[Rule]) -> Result<(), String> {
    OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", dir.display()));

    let planned = sorter::plan(dir, rule_list).map_err(|e| e.to_string())?;
    let unmatched = count_files(dir).saturating_sub(planned.len());

    if planned.is_empty() {
        OutputFormatter::plain("No files match any rule.");
        return Ok(());
    }

    OutputFormatter::header("Files would be sorted as follows:");
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for planned_move in &planned {
        OutputFormatter::plain(&format!(
            " - {}  → {}/",
            planned_move.file_name, planned_move.rule_name
        ));
        *counts.entry(planned_move.rule_name.clone()).or_insert(0) += 1;
    }
    OutputFormatter::summary_table(&counts, unmatched);

    OutputFormatter::success("Dry run complete. No files were modified.");
    Ok(())
}

fn undo_directory(organizer: &Arc<Organizer>, dir: PathBuf) -> Result<(), String> {
    OutputFormatter::info(&format!("Undoing previous sort of: {}", dir.display()));

    let operation = organizer.spawn_undo(dir);
    OutputFormatter::follow_progress("clearing", &operation.progress);
    let report = operation.wait().map_err(|e| e.to_string())?;

    OutputFormatter::success(&format!(
        "Sort undone: cleared {} entries and restored the backup.",
        report.removed_entries
    ));
    Ok(())
}

fn show_status(organizer: &Organizer, dir: &Path) {
    match organizer.backup_created_at(dir) {
        Some(created_at) if organizer.check_backup(dir) => OutputFormatter::success(&format!(
            "Backup available (taken {}). 'nautilus undo {}' will restore it.",
            created_at.format("%Y-%m-%d %H:%M:%S"),
            dir.display()
        )),
        _ => OutputFormatter::warning(&format!("No backup for {}.", dir.display())),
    }
}

fn run_rules_command(command: RulesCommand, settings: &Settings) -> Result<(), String> {
    match command {
        RulesCommand::List { rules } => {
            let store = settings.rule_store(rules.path.as_deref());
            let rule_list = store
                .load()
                .map_err(|e| format!("Error loading rules: {}", e))?;
            if !store.exists() {
                OutputFormatter::warning(&format!(
                    "{} does not exist; showing built-in defaults.",
                    store.path().display()
                ));
            }
            print_rules(&rule_list);
            Ok(())
        }
        RulesCommand::Init { rules, force } => {
            let store = settings.rule_store(rules.path.as_deref());
            if store.exists() && !force {
                return Err(format!(
                    "{} already exists. Use --force to overwrite it.",
                    store.path().display()
                ));
            }
            store
                .save(&rules::default_rules())
                .map_err(|e| format!("Error saving rules: {}", e))?;
            OutputFormatter::success(&format!("Wrote default rules to {}", store.path().display()));
            Ok(())
        }
        RulesCommand::Add {
            name,
            extensions,
            keywords,
            rules,
        } => {
            let store = settings.rule_store(rules.path.as_deref());
            let rule = Rule::new(name).with_extensions(extensions).with_keywords(keywords);
            let rule_list = store
                .add(rule)
                .map_err(|e| format!("Error saving rules: {}", e))?;
            OutputFormatter::success(&format!("Rule added ({} rules total).", rule_list.len()));
            Ok(())
        }
        RulesCommand::Remove { name, rules } => {
            let store = settings.rule_store(rules.path.as_deref());
            let removed = store
                .remove(&name)
                .map_err(|e| format!("Error saving rules: {}", e))?;
            if removed == 0 {
                OutputFormatter::warning(&format!("No rule named '{}'.", name));
            } else {
                OutputFormatter::success(&format!("Removed {} rule(s) named '{}'.", removed, name));
            }
            Ok(())
        }
    }
}

fn print_rules(rule_list: &[Rule]) {
    OutputFormatter::header("Rules (first match wins):");
    for (idx, rule) in rule_list.iter().enumerate() {
        let extensions = if rule.extensions.is_empty() {
            "-".to_string()
        } else {
            rule.extensions.join(" ")
        };
        let keywords = if rule.keywords.is_empty() {
            "-".to_string()
        } else {
            rule.keywords.join(", ")
        };
        OutputFormatter::plain(&format!(
            "{:>2}. {}/\n    extensions: {}\n    keywords:   {}",
            idx + 1,
            rule.name,
            extensions,
            keywords
        ));
    }
}

/// Number of plain files directly inside `dir`; zero if it cannot be listed.
fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|entry| std::fs::metadata(entry.path()).is_ok_and(|m| m.is_file()))
                .count()
        })
        .unwrap_or(0)
}
