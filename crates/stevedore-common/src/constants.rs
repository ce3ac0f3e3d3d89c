//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for Stevedore data on Linux with root access.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/stevedore";

/// Returns the data directory, preferring `$HOME/.stevedore` for non-root
/// or non-Linux environments, falling back to `/var/lib/stevedore`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        let user_dir = PathBuf::from(home).join(".stevedore");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// File name of the backend state index inside the data directory.
pub const STATE_FILE_NAME: &str = "state.json";

/// Directory (relative to the data directory) holding container log symlinks.
pub const LOG_DIR_NAME: &str = "logs";

/// Directory (relative to the data directory) holding per-container scratch space.
pub const SCRATCH_DIR_NAME: &str = "scratch";

/// Extension appended to a container ID to form its log symlink name.
pub const LOG_SYMLINK_EXTENSION: &str = "log";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "stvd";

/// Environment variable overriding the data directory for the CLI.
pub const DATA_DIR_ENV: &str = "STEVEDORE_DATA_DIR";
