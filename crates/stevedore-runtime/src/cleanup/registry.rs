//! In-memory registry of pending cleanup metadata.
//!
//! A container ID is present if and only if its creation-time cleanup
//! metadata has not yet been consumed successfully. The registry lives for
//! the lifetime of the process and is never persisted.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use stevedore_common::types::ContainerId;

use super::CleanupInfo;

/// Concurrency-safe map from container ID to pending cleanup metadata.
///
/// A single reader/writer lock guards the whole map. The lock is held only
/// for the map access itself, never across I/O.
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    infos: RwLock<HashMap<ContainerId, CleanupInfo>>,
}

impl CleanupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the metadata registered for `id`, if any.
    #[must_use]
    pub fn get(&self, id: &ContainerId) -> Option<CleanupInfo> {
        self.read().get(id).cloned()
    }

    /// Registers metadata for `id`, replacing any previous entry.
    pub fn set(&self, id: ContainerId, info: CleanupInfo) {
        if self.write().insert(id.clone(), info).is_some() {
            tracing::debug!(id = %id, "replaced existing cleanup info");
        }
    }

    /// Removes the entry for `id`. Clearing an absent ID is a no-op.
    pub fn clear(&self, id: &ContainerId) {
        let _ = self.write().remove(id);
    }

    /// Returns `true` if metadata is registered for `id`.
    #[must_use]
    pub fn contains(&self, id: &ContainerId) -> bool {
        self.read().contains_key(id)
    }

    /// Number of containers with pending cleanup.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if no cleanup is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Every write is a single insert or remove, so a panicking holder
    // cannot leave the map half-updated.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ContainerId, CleanupInfo>> {
        self.infos.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ContainerId, CleanupInfo>> {
        self.infos.write().unwrap_or_else(PoisonError::into_inner)
    }
}
