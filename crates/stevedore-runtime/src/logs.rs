//! Container log symlink management.
//!
//! Each container's log file is exposed through a symlink in the log
//! directory. The backend deletes the log file itself when the container
//! is removed, so the symlink has to be removed separately.

use std::path::{Path, PathBuf};

use stevedore_common::constants::LOG_SYMLINK_EXTENSION;
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::ContainerId;

/// Removes the log symlink owned by a container.
pub trait LogSymlinks: Send + Sync {
    /// Removes the symlink for `id`. An absent symlink is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the symlink exists but cannot be removed.
    fn remove_container_log_symlink(&self, id: &ContainerId) -> Result<()>;
}

/// Log symlinks stored as `<log_dir>/<id>.log`.
#[derive(Debug, Clone)]
pub struct FsLogSymlinks {
    log_dir: PathBuf,
}

impl FsLogSymlinks {
    /// Creates a manager for the given log directory.
    #[must_use]
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
        }
    }

    /// Returns the symlink path for a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the ID would resolve outside the log directory.
    pub fn symlink_path(&self, id: &ContainerId) -> Result<PathBuf> {
        let raw = id.as_str();
        if raw.is_empty() || raw == "." || raw == ".." || raw.contains(['/', '\\', '\0']) {
            return Err(StevedoreError::Config {
                message: format!("container ID {raw:?} cannot name a log symlink"),
            });
        }
        Ok(symlink_path(&self.log_dir, id))
    }

    /// Points the container's log symlink at `target`, replacing any
    /// previous link.
    ///
    /// # Errors
    ///
    /// Returns an error if the log directory or the symlink cannot be created.
    #[cfg(unix)]
    pub fn create_container_log_symlink(&self, id: &ContainerId, target: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.log_dir).map_err(|e| StevedoreError::io(&self.log_dir, e))?;
        let link = self.symlink_path(id)?;
        self.remove_container_log_symlink(id)?;
        std::os::unix::fs::symlink(target, &link).map_err(|e| StevedoreError::io(&link, e))?;
        tracing::debug!(id = %id, link = %link.display(), target = %target.display(), "created log symlink");
        Ok(link)
    }
}

impl LogSymlinks for FsLogSymlinks {
    fn remove_container_log_symlink(&self, id: &ContainerId) -> Result<()> {
        let link = self.symlink_path(id)?;
        let metadata = match std::fs::symlink_metadata(&link) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StevedoreError::io(link, e)),
        };
        if !metadata.file_type().is_symlink() {
            return Err(StevedoreError::Config {
                message: format!("refusing to remove {}: not a symlink", link.display()),
            });
        }
        std::fs::remove_file(&link).map_err(|e| StevedoreError::io(&link, e))?;
        tracing::debug!(id = %id, link = %link.display(), "removed log symlink");
        Ok(())
    }
}

/// Returns the log symlink path for a container.
#[must_use]
pub fn symlink_path(log_dir: &Path, id: &ContainerId) -> PathBuf {
    log_dir.join(format!("{}.{LOG_SYMLINK_EXTENSION}", id.as_str()))
}
