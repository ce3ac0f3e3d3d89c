//! Platform-specific cleanup owed by containers at removal time.
//!
//! Metadata describing the owed work is produced when a container is
//! created, held in the [`CleanupRegistry`] and consumed by the
//! [`CleanupExecutor`] when the container is removed.

pub mod executor;
pub mod platform;
pub mod registry;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use executor::CleanupExecutor;
pub use platform::{HostCleanup, NoopCleanup, PlatformCleanup, detect_platform_cleanup};
pub use registry::CleanupRegistry;

/// Per-container cleanup metadata registered at creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CleanupInfo {
    /// The container required no special setup.
    #[default]
    None,
    /// Host resources set up for the container that must be released.
    Host(HostResources),
}

impl CleanupInfo {
    /// Returns `true` if no teardown work is owed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        match self {
            Self::None => true,
            Self::Host(resources) => resources.is_empty(),
        }
    }
}

/// Host resources owned by a single container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostResources {
    /// Mount points to detach.
    pub mounts: Vec<PathBuf>,
    /// Named volumes living under the scratch root.
    pub volumes: Vec<String>,
    /// Scratch directories to delete recursively.
    pub scratch_dirs: Vec<PathBuf>,
    /// Cgroup directories to remove.
    pub cgroup_dirs: Vec<PathBuf>,
}

impl HostResources {
    /// Returns `true` if no resource is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
            && self.volumes.is_empty()
            && self.scratch_dirs.is_empty()
            && self.cgroup_dirs.is_empty()
    }
}

/// A single failed cleanup step.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// A path could not be removed.
    #[error("failed to remove {path}: {source}")]
    Remove {
        /// Path that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A mount point could not be detached.
    #[error("failed to unmount {path}: {source}")]
    Unmount {
        /// Mount point that could not be detached.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Any other cleanup failure.
    #[error("{message}")]
    Other {
        /// Description of the failure.
        message: String,
    },
}

impl CleanupError {
    /// Builds a [`CleanupError::Other`] from a message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Checks that a volume name is a single path component under the volume root.
///
/// # Errors
///
/// Returns [`CleanupError::Other`] for empty names, `.`, `..`, or names
/// containing a path separator.
pub fn validate_volume_name(name: &str) -> Result<(), CleanupError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(CleanupError::other(format!("invalid volume name {name:?}")));
    }
    Ok(())
}

/// Renders a list of cleanup errors as `[first, second, ...]`.
#[must_use]
pub fn join_errors(errors: &[CleanupError]) -> String {
    let joined = errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}
