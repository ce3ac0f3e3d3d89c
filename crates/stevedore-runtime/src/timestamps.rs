//! Container timestamp extraction from backend inspection records.

use chrono::{DateTime, Datelike, Utc};
use stevedore_common::error::{Result, StevedoreError};

use crate::backend::InspectRecord;

/// Normalized lifecycle timestamps of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerTimestamps {
    /// When the container was created.
    pub created: DateTime<Utc>,
    /// When the container last started; see [`is_zero`] for "never".
    pub started: DateTime<Utc>,
    /// When the container last exited.
    pub finished: DateTime<Utc>,
}

impl ContainerTimestamps {
    /// Parses all three timestamps of an inspection record.
    ///
    /// Fields are parsed in order `Created`, `StartedAt`, `FinishedAt`;
    /// the first failure aborts extraction.
    ///
    /// # Errors
    ///
    /// Returns [`StevedoreError::InvalidTimestamp`] naming the field that
    /// failed to parse.
    pub fn from_inspect(record: &InspectRecord) -> Result<Self> {
        let created = parse_backend_timestamp("Created", &record.created)?;
        let started = parse_backend_timestamp("StartedAt", &record.state.started_at)?;
        let finished = parse_backend_timestamp("FinishedAt", &record.state.finished_at)?;
        Ok(Self {
            created,
            started,
            finished,
        })
    }
}

/// Parses a backend-native RFC 3339 timestamp (nanosecond precision allowed).
///
/// # Errors
///
/// Returns [`StevedoreError::InvalidTimestamp`] if `value` is malformed.
pub fn parse_backend_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| StevedoreError::InvalidTimestamp {
            field,
            value: value.to_string(),
            source,
        })
}

/// Returns `true` if `t` is the backend's "never happened" marker
/// (`0001-01-01T00:00:00Z`).
#[must_use]
pub fn is_zero(t: &DateTime<Utc>) -> bool {
    t.year() <= 1
}
