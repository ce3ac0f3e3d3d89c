//! Teardown orchestration.
//!
//! Removing a container takes three steps, each of which may fail on its
//! own:
//!
//! 1. Remove the log symlink. The backend deletes the log file together
//!    with the container, so the link must go first.
//! 2. Run platform cleanup for metadata registered at creation time.
//! 3. Ask the backend to remove the container, its volumes included.
//!
//! The first failing step ends the removal. A failed cleanup keeps its
//! registry entry, so calling [`TeardownService::remove_container`] again
//! retries it.
//!
//! Two concurrent removals of the same container are not serialized here.
//! Callers needing that guarantee must keep one removal in flight per ID.

use std::sync::Arc;

use stevedore_common::config::StevedoreConfig;
use stevedore_common::error::StevedoreError;
use stevedore_common::types::ContainerId;
use thiserror::Error;

use crate::backend::{ContainerBackend, RemoveOptions, StateBackend};
use crate::cleanup::{
    CleanupError, CleanupExecutor, CleanupInfo, CleanupRegistry, PlatformCleanup,
    detect_platform_cleanup, join_errors,
};
use crate::logs::{FsLogSymlinks, LogSymlinks};
use crate::timestamps::ContainerTimestamps;

/// Options the backend is always called with during teardown.
const TEARDOWN_REMOVE_OPTIONS: RemoveOptions = RemoveOptions {
    remove_volumes: true,
    force: true,
};

/// Response to a successful removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveContainerResponse;

/// Failure of a removal, identifying the container and the failing step.
#[derive(Debug, Error)]
pub enum TeardownError {
    /// The log symlink could not be removed; nothing else was attempted.
    #[error("failed to remove log symlink for container \"{id}\": {source}")]
    LogSymlink {
        /// Container being removed.
        id: ContainerId,
        /// Underlying error.
        source: StevedoreError,
    },

    /// Platform cleanup reported errors; the backend container was kept.
    #[error(
        "failed to run platform-specific clean ups for container \"{id}\": {}",
        join_errors(.errors)
    )]
    PlatformCleanup {
        /// Container being removed.
        id: ContainerId,
        /// Every cleanup step that failed.
        errors: Vec<CleanupError>,
    },

    /// The backend refused or failed to remove the container.
    #[error("failed to remove container \"{id}\": {source}")]
    Backend {
        /// Container being removed.
        id: ContainerId,
        /// Underlying error.
        source: StevedoreError,
    },
}

impl TeardownError {
    /// Returns the container the failed removal was for.
    #[must_use]
    pub const fn container_id(&self) -> &ContainerId {
        match self {
            Self::LogSymlink { id, .. }
            | Self::PlatformCleanup { id, .. }
            | Self::Backend { id, .. } => id,
        }
    }
}

/// Coordinates container removal across the log symlink, platform cleanup,
/// and the backend.
///
/// Shareable across threads; removals of different containers run fully in
/// parallel.
pub struct TeardownService {
    backend: Arc<dyn ContainerBackend>,
    log_symlinks: Arc<dyn LogSymlinks>,
    cleanup: CleanupExecutor,
}

impl TeardownService {
    /// Creates a service from explicit collaborators and an empty registry.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ContainerBackend>,
        log_symlinks: Arc<dyn LogSymlinks>,
        platform: Arc<dyn PlatformCleanup>,
    ) -> Self {
        Self::with_registry(backend, log_symlinks, platform, Arc::new(CleanupRegistry::new()))
    }

    /// Creates a service sharing an existing registry.
    #[must_use]
    pub fn with_registry(
        backend: Arc<dyn ContainerBackend>,
        log_symlinks: Arc<dyn LogSymlinks>,
        platform: Arc<dyn PlatformCleanup>,
        registry: Arc<CleanupRegistry>,
    ) -> Self {
        Self {
            backend,
            log_symlinks,
            cleanup: CleanupExecutor::new(registry, platform),
        }
    }

    /// Creates a service over the local state backend and the platform's
    /// default cleanup.
    #[must_use]
    pub fn from_config(config: &StevedoreConfig) -> Self {
        Self::new(
            Arc::new(StateBackend::from_config(config)),
            Arc::new(FsLogSymlinks::new(config.log_dir.clone())),
            detect_platform_cleanup(config),
        )
    }

    /// Returns the registry of pending cleanup metadata.
    #[must_use]
    pub fn registry(&self) -> &Arc<CleanupRegistry> {
        self.cleanup.registry()
    }

    /// Records the cleanup owed by a newly created container.
    pub fn register_cleanup(&self, id: ContainerId, info: CleanupInfo) {
        tracing::debug!(id = %id, noop = info.is_noop(), "registering cleanup info");
        self.registry().set(id, info);
    }

    /// Releases leftovers from a previous process instance.
    ///
    /// Errors are logged only and never prevent startup.
    pub fn startup_sweep(&self) {
        tracing::info!("sweeping cleanup leftovers from previous runs");
        self.cleanup.sweep_stale();
    }

    /// Removes a container.
    ///
    /// # Errors
    ///
    /// Returns the first failing step as a [`TeardownError`]. Steps after
    /// the failing one are not attempted.
    pub fn remove_container(
        &self,
        id: &ContainerId,
    ) -> Result<RemoveContainerResponse, TeardownError> {
        tracing::info!(id = %id, "removing container");

        self.log_symlinks
            .remove_container_log_symlink(id)
            .map_err(|source| TeardownError::LogSymlink {
                id: id.clone(),
                source,
            })?;

        let errors = self.cleanup.cleanup_container(id);
        if !errors.is_empty() {
            return Err(TeardownError::PlatformCleanup {
                id: id.clone(),
                errors,
            });
        }

        self.backend
            .remove(id, TEARDOWN_REMOVE_OPTIONS)
            .map_err(|source| TeardownError::Backend {
                id: id.clone(),
                source,
            })?;

        tracing::info!(id = %id, "container removed");
        Ok(RemoveContainerResponse)
    }

    /// Inspects a container and extracts its lifecycle timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if inspection fails or any timestamp is malformed.
    pub fn container_timestamps(
        &self,
        id: &ContainerId,
    ) -> stevedore_common::error::Result<ContainerTimestamps> {
        let record = self.backend.inspect(id)?;
        ContainerTimestamps::from_inspect(&record)
    }
}
