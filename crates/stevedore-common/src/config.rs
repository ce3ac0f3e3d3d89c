//! Global configuration model for the Stevedore runtime.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, StevedoreError};

/// Root configuration for the Stevedore runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StevedoreConfig {
    /// Base directory for Stevedore state and data.
    pub data_dir: PathBuf,
    /// Path to the backend state index file.
    pub state_file: PathBuf,
    /// Directory holding container log symlinks.
    pub log_dir: PathBuf,
    /// Directory holding per-container scratch space owed platform cleanup.
    pub scratch_dir: PathBuf,
}

impl StevedoreConfig {
    /// Builds a configuration with every path rooted under `data_dir`.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            state_file: data_dir.join(constants::STATE_FILE_NAME),
            log_dir: data_dir.join(constants::LOG_DIR_NAME),
            scratch_dir: data_dir.join(constants::SCRATCH_DIR_NAME),
            data_dir,
        }
    }

    /// Loads a configuration from a JSON file.
    ///
    /// Fields missing from the file fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| StevedoreError::io(path, e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every configured path is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if any path is empty.
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("data_dir", &self.data_dir),
            ("state_file", &self.state_file),
            ("log_dir", &self.log_dir),
            ("scratch_dir", &self.scratch_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(StevedoreError::Config {
                    message: format!("{name} must not be empty"),
                });
            }
        }
        Ok(())
    }
}

impl Default for StevedoreConfig {
    fn default() -> Self {
        Self::with_data_dir(constants::data_dir().clone())
    }
}
