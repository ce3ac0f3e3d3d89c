//! Formatted output helpers for CLI commands.

use chrono::{DateTime, Utc};
use stevedore_runtime::timestamps::is_zero;

/// Formats a container timestamp for humans, `-` for events that never happened.
#[must_use]
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    if is_zero(t) {
        return "-".to_string();
    }
    t.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string()
}
