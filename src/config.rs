//! Application settings.
//!
//! Settings are loaded from a TOML file and passed explicitly to the [`Organizer`],
//! which owns the backup store and the location of the rule store.
//!
//! # Configuration File Format
//!
//! ```toml
//! [backup]
//! enabled = true
//! directory = "/var/tmp"
//!
//! [rules]
//! path = "/home/me/.config/nautilus/rules.json"
//! ```
//!
//! [`Organizer`]: crate::organizer::Organizer

use crate::backup::BackupStore;
use crate::rule_store::RuleStore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory settings file.
pub const LOCAL_CONFIG_FILE: &str = ".nautilusrc.toml";

/// Errors that can occur while loading settings or the rule store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// Invalid TOML or JSON syntax or structure.
    #[error("Invalid configuration in {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },
    /// IO error while reading or writing a configuration file.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The rule list was rejected while loading or saving it.
    #[error(transparent)]
    Rules(#[from] crate::error::NautilusError),
}

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub backup: BackupSettings,
    #[serde(default)]
    pub rules: RuleSettings,
}

/// Snapshot behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Whether a sort snapshots the directory first. Defaults to true.
    #[serde(default = "default_backup_enabled")]
    pub enabled: bool,
    /// Directory that holds snapshots. Defaults to the OS temp dir.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_backup_enabled() -> bool {
    true
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: default_backup_enabled(),
            directory: None,
        }
    }
}

/// Where the rule list lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Rule store path. Defaults to `~/.config/nautilus/rules.json`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a file, with fallback to defaults.
    ///
    /// Attempts to load settings in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.nautilusrc.toml` in the current directory
    /// 3. Look for `~/.config/nautilus/config.toml` in the home directory
    /// 4. Fall back to default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a file is explicitly provided but cannot be read, or if
    /// any file found is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(home_config) = config_dir().map(|dir| dir.join("config.toml"))
            && home_config.exists()
        {
            return Self::load_from_file(&home_config);
        }

        Ok(Self::default())
    }

    /// Load settings from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: Self = toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Backup store rooted at the configured directory, or the OS temp dir.
    pub fn backup_store(&self) -> BackupStore {
        match &self.backup.directory {
            Some(dir) => BackupStore::new(dir),
            None => BackupStore::default(),
        }
    }

    /// Rule store at `override_path`, the configured path, or the default location.
    pub fn rule_store(&self, override_path: Option<&Path>) -> RuleStore {
        let path = override_path
            .map(Path::to_path_buf)
            .or_else(|| self.rules.path.clone())
            .or_else(|| config_dir().map(|dir| dir.join("rules.json")))
            .unwrap_or_else(|| PathBuf::from("rules.json"));
        RuleStore::new(path)
    }
}

/// `~/.config/nautilus`, if `HOME` is set.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config").join("nautilus"))
}
