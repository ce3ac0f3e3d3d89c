//! Pluggable platform cleanup capability.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stevedore_common::config::StevedoreConfig;

use super::{CleanupError, CleanupInfo, HostResources, validate_volume_name};

/// Extension of staging directories left under the scratch root by a
/// container creation that never completed.
const PARTIAL_EXTENSION: &str = "partial";

/// Platform-specific teardown work for a container.
///
/// Each independent step that fails contributes one error; a failing step
/// never prevents the remaining steps from running.
pub trait PlatformCleanup: Send + Sync {
    /// Releases every resource described by `info`.
    fn cleanup(&self, info: &CleanupInfo) -> Vec<CleanupError>;

    /// Releases resources left behind by a previous process instance.
    fn init_cleanup(&self) -> Vec<CleanupError> {
        Vec::new()
    }
}

/// Cleanup for platforms with no special teardown needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCleanup;

impl PlatformCleanup for NoopCleanup {
    fn cleanup(&self, _info: &CleanupInfo) -> Vec<CleanupError> {
        Vec::new()
    }
}

/// Releases host mounts, volumes, scratch and cgroup directories.
///
/// Paths that are already gone count as released, so a retried cleanup
/// only reports what is still outstanding.
#[derive(Debug, Clone)]
pub struct HostCleanup {
    scratch_root: PathBuf,
}

impl HostCleanup {
    /// Creates a host cleanup rooted at the given scratch directory.
    #[must_use]
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
        }
    }

    /// Returns the directory backing a named volume.
    #[must_use]
    pub fn volume_path(&self, name: &str) -> PathBuf {
        self.scratch_root.join("volumes").join(name)
    }

    fn release(&self, resources: &HostResources) -> Vec<CleanupError> {
        let mut errors = Vec::new();

        // Mounts go first so the directories below are no longer busy.
        for mount in &resources.mounts {
            if let Err(e) = unmount(mount) {
                errors.push(e);
            }
        }
        for name in &resources.volumes {
            if let Err(e) = validate_volume_name(name) {
                errors.push(e);
                continue;
            }
            if let Err(e) = remove_path(&self.volume_path(name), |p| std::fs::remove_dir_all(p)) {
                errors.push(e);
            }
        }
        for dir in &resources.scratch_dirs {
            if let Err(e) = remove_path(dir, |p| std::fs::remove_dir_all(p)) {
                errors.push(e);
            }
        }
        // Cgroup directories only support rmdir.
        for dir in &resources.cgroup_dirs {
            if let Err(e) = remove_path(dir, |p| std::fs::remove_dir(p)) {
                errors.push(e);
            }
        }
        errors
    }
}

impl PlatformCleanup for HostCleanup {
    fn cleanup(&self, info: &CleanupInfo) -> Vec<CleanupError> {
        match info {
            CleanupInfo::None => Vec::new(),
            CleanupInfo::Host(resources) => self.release(resources),
        }
    }

    fn init_cleanup(&self) -> Vec<CleanupError> {
        let entries = match std::fs::read_dir(&self.scratch_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(source) => {
                return vec![CleanupError::Remove {
                    path: self.scratch_root.clone(),
                    source,
                }];
            }
        };

        let mut errors = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(source) => {
                    errors.push(CleanupError::Remove {
                        path: self.scratch_root.clone(),
                        source,
                    });
                    continue;
                }
            };
            if path.extension().is_some_and(|ext| ext == PARTIAL_EXTENSION) {
                tracing::debug!(path = %path.display(), "removing stale staging directory");
                if let Err(e) = remove_path(&path, |p| std::fs::remove_dir_all(p)) {
                    errors.push(e);
                }
            }
        }
        errors
    }
}

/// Picks the cleanup capability for the current platform.
#[must_use]
pub fn detect_platform_cleanup(config: &StevedoreConfig) -> Arc<dyn PlatformCleanup> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(HostCleanup::new(config.scratch_dir.clone()))
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = config;
        Arc::new(NoopCleanup)
    }
}

fn remove_path(path: &Path, remove: fn(&Path) -> io::Result<()>) -> Result<(), CleanupError> {
    match remove(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CleanupError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Lazily detaches a mount point. Paths that are not mounted are skipped.
#[cfg(target_os = "linux")]
fn unmount(path: &Path) -> Result<(), CleanupError> {
    use nix::errno::Errno;
    use nix::mount::{MntFlags, umount2};

    match umount2(path, MntFlags::MNT_DETACH) {
        Ok(()) | Err(Errno::EINVAL | Errno::ENOENT) => Ok(()),
        Err(errno) => Err(CleanupError::Unmount {
            path: path.to_path_buf(),
            source: io::Error::from(errno),
        }),
    }
}

#[cfg(not(target_os = "linux"))]
fn unmount(path: &Path) -> Result<(), CleanupError> {
    tracing::debug!(path = %path.display(), "unmount not supported on this platform");
    Ok(())
}
