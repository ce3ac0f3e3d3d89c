//! Runs platform cleanup against registered metadata.

use std::sync::Arc;

use stevedore_common::types::ContainerId;

use super::{CleanupError, CleanupInfo, CleanupRegistry, PlatformCleanup};

/// Invokes the platform cleanup capability for registered containers.
///
/// Registry entries are consumed only when cleanup reports no errors, so a
/// partially failed cleanup is attempted again on the next removal.
pub struct CleanupExecutor {
    registry: Arc<CleanupRegistry>,
    platform: Arc<dyn PlatformCleanup>,
}

impl CleanupExecutor {
    /// Creates an executor over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<CleanupRegistry>, platform: Arc<dyn PlatformCleanup>) -> Self {
        Self { registry, platform }
    }

    /// Returns the registry this executor consumes.
    #[must_use]
    pub fn registry(&self) -> &Arc<CleanupRegistry> {
        &self.registry
    }

    /// Runs the cleanup owed by `id`, if any, and returns every error.
    ///
    /// A container without registered metadata yields no errors. The
    /// registry entry is cleared only when the returned list is empty.
    pub fn cleanup_container(&self, id: &ContainerId) -> Vec<CleanupError> {
        let Some(info) = self.registry.get(id) else {
            return Vec::new();
        };

        let errors = self.cleanup_and_log(id, Some(&info));
        if errors.is_empty() {
            self.registry.clear(id);
            tracing::debug!(id = %id, "cleanup info consumed");
        }
        errors
    }

    /// Invokes the platform cleanup for `info` and logs each error.
    ///
    /// Missing metadata is a no-op.
    pub fn cleanup_and_log(&self, id: &ContainerId, info: Option<&CleanupInfo>) -> Vec<CleanupError> {
        let Some(info) = info else {
            return Vec::new();
        };

        let errors = self.platform.cleanup(info);
        for error in &errors {
            tracing::info!(id = %id, %error, "error when cleaning up after container");
        }
        errors
    }

    /// Releases leftovers from a previous process instance.
    ///
    /// Errors are logged and discarded; this never fails.
    pub fn sweep_stale(&self) {
        let errors = self.platform.init_cleanup();
        for error in &errors {
            tracing::info!(%error, "error during startup cleanup");
        }
        if !errors.is_empty() {
            tracing::warn!(count = errors.len(), "startup cleanup finished with errors");
        }
    }
}
