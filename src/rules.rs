//! Classification rules and first-match selection.
//!
//! A rule names a sub-folder and lists the extensions and keywords that send a file
//! there. Rules are kept in user order and the first rule that matches a file wins,
//! even when a later rule is more specific.
//!
//! # Examples
//!
//! ```
//! use nautilus::rules::{Rule, match_rule};
//!
//! let rules = vec![
//!     Rule::new("Images").with_extensions([".jpg", ".png"]),
//!     Rule::new("Docs").with_keywords(["invoice"]),
//! ];
//! assert_eq!(match_rule("photo.JPG", &rules).map(|r| r.name.as_str()), Some("Images"));
//! assert_eq!(match_rule("Invoice_march.txt", &rules).map(|r| r.name.as_str()), Some("Docs"));
//! assert!(match_rule("notes.txt", &rules).is_none());
//! ```

use crate::error::{NautilusError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// A single classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Sub-folder the matched files are moved into.
    pub name: String,
    /// Extensions including the leading dot (e.g. ".jpg"). Compared case-insensitively.
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Case-insensitive substrings searched for in the file name.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Rule {
    /// Creates a rule with no extensions and no keywords. Such a rule never matches.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: Vec::new(),
            keywords: Vec::new(),
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions.extend(extensions.into_iter().map(Into::into));
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Returns true if the file's extension is listed or any keyword occurs in its name.
    pub fn matches(&self, file_name: &str) -> bool {
        let extension = file_extension(file_name);
        let matches_extension = !extension.is_empty()
            && self
                .extensions
                .iter()
                .any(|ext| ext.to_lowercase() == extension);
        if matches_extension {
            return true;
        }

        let lower_name = file_name.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| lower_name.contains(&keyword.to_lowercase()))
    }

    /// Checks that the rule can only ever steer files into a direct child folder.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRule` when the name is empty or not a single plain path
    /// component, when an extension lacks its leading dot, or when a keyword is blank.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| NautilusError::InvalidRule {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("folder name is empty"));
        }
        if self.name.contains(['/', '\\']) {
            return Err(invalid("folder name must not contain path separators"));
        }
        let mut components = Path::new(&self.name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(invalid("folder name must be a plain folder name"));
        }

        for ext in &self.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(invalid(&format!(
                    "extension '{ext}' must start with '.' followed by at least one character"
                )));
            }
        }
        if self.keywords.iter().any(|keyword| keyword.trim().is_empty()) {
            return Err(invalid("keywords must not be blank"));
        }

        Ok(())
    }
}

/// Returns the lower-cased extension of a file name, including the dot.
///
/// The extension starts at the last `.`; names without a dot, and dot-files such as
/// `.bashrc` whose only dot is the leading one, have an empty extension.
pub fn file_extension(file_name: &str) -> String {
    match file_name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => file_name[idx..].to_lowercase(),
    }
}

/// Returns the first rule, in list order, that matches `file_name`.
pub fn match_rule<'a>(file_name: &str, rules: &'a [Rule]) -> Option<&'a Rule> {
    rules.iter().find(|rule| rule.matches(file_name))
}

/// Validates every rule in the list, stopping at the first invalid one.
pub fn validate_rules(rules: &[Rule]) -> Result<()> {
    rules.iter().try_for_each(Rule::validate)
}

/// Rule list used when no rule store exists yet.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new("Images").with_extensions([
            ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".tiff", ".ico", ".heic",
        ]),
        Rule::new("Videos").with_extensions([
            ".mp4", ".mkv", ".avi", ".mov", ".flv", ".wmv", ".webm", ".3gp",
        ]),
        Rule::new("Audio")
            .with_extensions([".mp3", ".wav", ".ogg", ".flac", ".aac", ".m4a", ".wma"]),
        Rule::new("Documents")
            .with_extensions([
                ".pdf", ".txt", ".doc", ".docx", ".md", ".rtf", ".odt", ".csv", ".xls", ".xlsx",
                ".ods", ".ppt", ".pptx", ".odp",
            ])
            .with_keywords(["invoice", "facture"]),
        Rule::new("Archives")
            .with_extensions([".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz"]),
        Rule::new("Code").with_extensions([
            ".py", ".java", ".c", ".cpp", ".h", ".hpp", ".js", ".ts", ".rs", ".go", ".sh",
            ".json", ".xml", ".yaml", ".yml", ".toml",
        ]),
    ]
}
