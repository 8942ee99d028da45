use std::{
    env, fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{NoteError, Result};

pub const ENV_DB_PATH: &str = "NOTEDESK_DB_PATH";
pub const ENV_ATTACHMENTS_DIR: &str = "NOTEDESK_ATTACHMENTS_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "NOTEDESK_DB_BUSY_TIMEOUT_MS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// SQLite database file holding notes, tags and attachment records
    pub database_path: PathBuf,

    /// Application-private directory for attachment files
    pub attachments_dir: PathBuf,

    /// How long a store call waits on a locked database (milliseconds)
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            database_path: data_dir.join("notes.db"),
            attachments_dir: data_dir.join("attachments"),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Builds the effective configuration.
    ///
    /// Defaults, then the config file (the explicit one, or the per-user one
    /// if it exists), then environment overrides.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => match default_config_file().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| env::var(key).ok())?;
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NoteError::FileNotFound {
                file_path: path.display().to_string(),
            });
        }
        info!("Loading configuration from {}", path.display());
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| NoteError::ConfigError {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Applies overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH).filter(|v| !v.is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(ENV_ATTACHMENTS_DIR).filter(|v| !v.is_empty()) {
            self.attachments_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS).filter(|v| !v.is_empty()) {
            self.busy_timeout_ms = raw.trim().parse().map_err(|_| NoteError::ConfigError {
                message: format!("{} must be a whole number of milliseconds, got '{}'", ENV_BUSY_TIMEOUT_MS, raw),
            })?;
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "notedesk")
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".notedesk"))
}

/// Per-user config file location, when the platform has one.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
}
