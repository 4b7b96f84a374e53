//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status lines,
//! percentage progress bars fed from an operation's progress channel, and the
//! per-folder summary table printed after a sort or a dry run.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nautilus::output::OutputFormatter;
    /// OutputFormatter::success("Sort complete!");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a 0-100 percentage bar.
    pub fn create_progress_bar(message: &str) -> ProgressBar {
        let pb = ProgressBar::new(100);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb
    }

    /// Drives a progress bar from `progress` until the channel closes.
    ///
    /// Returns the last percentage received, if any.
    pub fn follow_progress(message: &str, progress: &Receiver<u8>) -> Option<u8> {
        let pb = Self::create_progress_bar(message);
        let mut last = None;
        for percent in progress.iter() {
            pb.set_position(u64::from(percent));
            last = Some(percent);
        }
        pb.finish_and_clear();
        last
    }

    /// Prints a summary table with file counts per rule folder.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nautilus::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("Docs".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 2);
    /// ```
    pub fn summary_table(folder_counts: &BTreeMap<String, usize>, unmatched: usize) {
        Self::header("SUMMARY");

        let width = folder_counts
            .keys()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0)
            .max("(unsorted)".len());

        println!("{:<width$} | {}", "Folder".bold(), "Files".bold(), width = width);
        println!("{}", "-".repeat(width + 10));

        for (folder, count) in folder_counts {
            println!(
                "{:<width$} | {} {}",
                folder,
                count.to_string().green(),
                file_word(*count),
                width = width
            );
        }
        if unmatched > 0 {
            println!(
                "{:<width$} | {} {}",
                "(unsorted)".dimmed(),
                unmatched.to_string().yellow(),
                file_word(unmatched),
                width = width
            );
        }

        let total: usize = folder_counts.values().sum::<usize>() + unmatched;
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            file_word(total),
            width = width
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn file_word(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
