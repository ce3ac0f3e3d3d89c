//! Local backend backed by the on-disk state index.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use stevedore_common::config::StevedoreConfig;
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{ContainerId, ContainerState};

use super::{ContainerBackend, ContainerConfig, InspectRecord, InspectState, RemoveOptions};
use crate::cleanup::validate_volume_name;
use crate::state::{self, StateEntry, ZERO_TIMESTAMP};

/// Backend that tracks containers in a JSON state index.
///
/// Read-modify-write cycles on the index are serialized by an internal
/// lock so concurrent removals of different containers do not lose updates.
pub struct StateBackend {
    state_file: PathBuf,
    volume_root: PathBuf,
    lock: Mutex<()>,
}

impl StateBackend {
    /// Creates a backend over the given state file and volume directory.
    #[must_use]
    pub fn new(state_file: impl Into<PathBuf>, volume_root: impl Into<PathBuf>) -> Self {
        Self {
            state_file: state_file.into(),
            volume_root: volume_root.into(),
            lock: Mutex::new(()),
        }
    }

    /// Creates a backend from the runtime configuration.
    #[must_use]
    pub fn from_config(config: &StevedoreConfig) -> Self {
        Self::new(config.state_file.clone(), config.scratch_dir.join("volumes"))
    }

    /// Moves a container to a new lifecycle state, stamping start and exit times.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or the index cannot be saved.
    pub fn transition(&self, id: &ContainerId, to: ContainerState) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut index = state::load_state(&self.state_file)?;
        let entry = index
            .containers
            .iter_mut()
            .find(|e| e.id == *id)
            .ok_or_else(|| not_found(id))?;

        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true);
        match to {
            ContainerState::Running => {
                entry.started_at.clone_from(&now);
                entry.finished_at = ZERO_TIMESTAMP.into();
            }
            ContainerState::Exited => entry.finished_at.clone_from(&now),
            ContainerState::Created => {}
        }
        entry.state = to;
        tracing::info!(id = %id, state = %to, "container state changed");
        state::save_state(&self.state_file, &index)
    }

    fn remove_volume(&self, name: &str) -> Result<()> {
        validate_volume(name)?;
        let path = self.volume_root.join(name);
        match std::fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StevedoreError::io(path, e)),
        }
    }
}

impl ContainerBackend for StateBackend {
    fn create(&self, config: &ContainerConfig) -> Result<ContainerId> {
        for volume in &config.volumes {
            validate_volume(volume)?;
        }
        let id = ContainerId::generate();
        tracing::info!(id = %id, name = %config.name, "creating container");

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut index = state::load_state(&self.state_file)?;
        index.containers.push(StateEntry {
            id: id.clone(),
            name: config.name.clone(),
            image: config.image.clone(),
            state: ContainerState::Created,
            created: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
            started_at: ZERO_TIMESTAMP.into(),
            finished_at: ZERO_TIMESTAMP.into(),
            volumes: config.volumes.clone(),
        });
        state::save_state(&self.state_file, &index)?;
        Ok(id)
    }

    fn inspect(&self, id: &ContainerId) -> Result<InspectRecord> {
        let index = {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            state::load_state(&self.state_file)?
        };
        let entry = index.find(id).ok_or_else(|| not_found(id))?;
        Ok(InspectRecord {
            id: entry.id.clone(),
            created: entry.created.clone(),
            state: InspectState {
                status: entry.state.to_string(),
                started_at: entry.started_at.clone(),
                finished_at: entry.finished_at.clone(),
            },
        })
    }

    fn remove(&self, id: &ContainerId, options: RemoveOptions) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut index = state::load_state(&self.state_file)?;
        let Some(pos) = index.containers.iter().position(|e| e.id == *id) else {
            if options.force {
                tracing::debug!(id = %id, "container already removed");
                return Ok(());
            }
            return Err(not_found(id));
        };

        if index.containers[pos].state == ContainerState::Running && !options.force {
            return Err(StevedoreError::Config {
                message: format!("container {id} is running; stop it or force removal"),
            });
        }

        // Volumes go first: the entry must survive a failure so a retry
        // still knows which volumes are owed.
        if options.remove_volumes {
            for volume in &index.containers[pos].volumes {
                self.remove_volume(volume)?;
            }
        }
        let _ = index.containers.remove(pos);
        state::save_state(&self.state_file, &index)?;
        tracing::info!(id = %id, "container removed");
        Ok(())
    }
}

fn validate_volume(name: &str) -> Result<()> {
    validate_volume_name(name).map_err(|e| StevedoreError::Config {
        message: e.to_string(),
    })
}

fn not_found(id: &ContainerId) -> StevedoreError {
    StevedoreError::NotFound {
        kind: "container",
        id: id.to_string(),
    }
}
