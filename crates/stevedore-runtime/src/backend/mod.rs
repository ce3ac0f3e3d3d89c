//! Container backend abstraction.

pub mod local;

use serde::{Deserialize, Serialize};
use stevedore_common::error::Result;
use stevedore_common::types::ContainerId;

pub use local::StateBackend;

/// Configuration for creating a container.
#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    /// Human-readable container name.
    pub name: String,
    /// Image reference.
    pub image: String,
    /// Named volumes attached to the container.
    pub volumes: Vec<String>,
}

/// Options controlling backend container removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Also remove volumes associated with the container.
    pub remove_volumes: bool,
    /// Remove the container even if it is running.
    pub force: bool,
}

/// Backend inspection record, with timestamps in backend-native form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectRecord {
    /// Container identifier.
    pub id: ContainerId,
    /// Creation timestamp.
    pub created: String,
    /// Runtime state.
    pub state: InspectState,
}

/// Runtime portion of an [`InspectRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectState {
    /// Lifecycle state name.
    pub status: String,
    /// Start timestamp.
    pub started_at: String,
    /// Exit timestamp.
    pub finished_at: String,
}

/// Container backend primitives used by teardown.
///
/// Calls block until the backend responds.
pub trait ContainerBackend: Send + Sync {
    /// Creates a container from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be created.
    fn create(&self, config: &ContainerConfig) -> Result<ContainerId>;

    /// Returns the inspection record for a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is unknown or state cannot be read.
    fn inspect(&self, id: &ContainerId) -> Result<InspectRecord>;

    /// Removes a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be removed.
    fn remove(&self, id: &ContainerId, options: RemoveOptions) -> Result<()>;
}
