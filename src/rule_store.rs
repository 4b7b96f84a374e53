//! JSON persistence for the ordered rule list.
//!
//! The file holds `{ "rules": [ { "name", "extensions", "keywords" } ] }`. Rule order
//! is significant and is preserved exactly on load and save.

use crate::config::ConfigError;
use crate::rules::{self, Rule};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Reads and writes the rule list at a fixed path.
#[derive(Debug, Clone)]
pub struct RuleStore {
    path: PathBuf,
}

impl RuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the stored rules in order.
    ///
    /// A missing file yields the built-in default rules; nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON of the expected
    /// shape, or contains an invalid rule.
    pub fn load(&self) -> Result<Vec<Rule>, ConfigError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no rule store, using defaults");
            return Ok(rules::default_rules());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        let file: RuleFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ConfigInvalid {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        rules::validate_rules(&file.rules)?;
        Ok(file.rules)
    }

    /// Replaces the stored rules with `rules`, in order. Creates parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule is invalid or the file cannot be written.
    pub fn save(&self, rules: &[Rule]) -> Result<(), ConfigError> {
        rules::validate_rules(rules)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = RuleFile {
            rules: rules.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| ConfigError::ConfigInvalid {
            path: self.path.clone(),
            reason: format!("JSON serialization failed: {}", e),
        })?;
        fs::write(&self.path, json).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!(path = %self.path.display(), rules = rules.len(), "saved rules");
        Ok(())
    }

    /// Appends `rule` after the existing rules and saves.
    pub fn add(&self, rule: Rule) -> Result<Vec<Rule>, ConfigError> {
        let mut rules = self.load()?;
        rules.push(rule);
        self.save(&rules)?;
        Ok(rules)
    }

    /// Removes every rule called `name` and saves. Returns how many were removed.
    pub fn remove(&self, name: &str) -> Result<usize, ConfigError> {
        let mut rules = self.load()?;
        let before = rules.len();
        rules.retain(|rule| rule.name != name);
        let removed = before - rules.len();
        if removed > 0 {
            self.save(&rules)?;
        }
        Ok(removed)
    }
}
