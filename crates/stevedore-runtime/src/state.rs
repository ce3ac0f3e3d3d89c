//! Persistent state management.
//!
//! Maintains a local JSON index of all containers known to the local
//! backend. Writes are atomic: the index is written to a temporary file and
//! renamed over the previous one.

use std::path::Path;

use serde::{Deserialize, Serialize};
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{ContainerId, ContainerState};

/// Timestamp the backend reports for events that have not happened yet.
pub const ZERO_TIMESTAMP: &str = "0001-01-01T00:00:00Z";

/// Persistent record of a container's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Container identifier.
    pub id: ContainerId,
    /// Human-readable name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// RFC 3339 creation timestamp.
    pub created: String,
    /// RFC 3339 start timestamp, [`ZERO_TIMESTAMP`] if never started.
    pub started_at: String,
    /// RFC 3339 exit timestamp, [`ZERO_TIMESTAMP`] if still running.
    pub finished_at: String,
    /// Names of volumes attached to the container.
    #[serde(default)]
    pub volumes: Vec<String>,
}

/// On-disk index of every tracked container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateIndex {
    /// Tracked containers, in creation order.
    pub containers: Vec<StateEntry>,
}

impl StateIndex {
    /// Finds the entry for `id`.
    #[must_use]
    pub fn find(&self, id: &ContainerId) -> Option<&StateEntry> {
        self.containers.iter().find(|e| e.id == *id)
    }
}

/// Loads the state index from disk.
///
/// A missing file yields an empty index.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_state(path: &Path) -> Result<StateIndex> {
    tracing::debug!(path = %path.display(), "loading state index");
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StateIndex::default()),
        Err(e) => return Err(StevedoreError::io(path, e)),
    };
    Ok(serde_json::from_str(&content)?)
}

/// Persists the state index to disk atomically.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_state(path: &Path, index: &StateIndex) -> Result<()> {
    tracing::debug!(path = %path.display(), count = index.containers.len(), "saving state index");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StevedoreError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(index)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| StevedoreError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| StevedoreError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> StateEntry {
        StateEntry {
            id: ContainerId::new(id),
            name: format!("{id}-name"),
            image: "busybox".into(),
            state: ContainerState::Created,
            created: "2024-03-01T10:00:00.123456789Z".into(),
            started_at: ZERO_TIMESTAMP.into(),
            finished_at: ZERO_TIMESTAMP.into(),
            volumes: vec![],
        }
    }

    #[test]
    fn load_missing_file_returns_empty_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = load_state(&dir.path().join("state.json")).expect("load");
        assert!(index.containers.is_empty());
    }

    #[test]
    fn save_then_load_preserves_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");
        let index = StateIndex {
            containers: vec![entry("a"), entry("b")],
        };
        save_state(&path, &index).expect("save");

        let loaded = load_state(&path).expect("load");
        assert_eq!(loaded.containers, index.containers);
        assert!(loaded.find(&ContainerId::new("b")).is_some());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn load_corrupt_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").expect("write");
        assert!(matches!(
            load_state(&path),
            Err(StevedoreError::Serialization { .. })
        ));
    }
}
