//! Persisted display preferences.
//!
//! Stored as a small JSON document next to the catalog cache. A missing or
//! unreadable file yields the defaults; individual missing fields default
//! too, so the format can grow without breaking old files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("failed to write preferences: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode preferences: {0}")]
    Json(#[from] serde_json::Error),
}

/// Display language for rendered boards and messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
}

/// How departure times are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// Countdown in minutes.
    #[default]
    Minutes,
    /// Clock time of departure.
    Time,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub dark_mode: bool,
    pub language: Language,
    pub time_format: TimeFormat,
}

impl Preferences {
    /// Load preferences, falling back to defaults when the file is absent
    /// or does not parse.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!(error = %e, "preferences file did not parse, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Write preferences, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), PrefsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Conventional location inside a data directory.
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("preferences.json")
    }
}
