//! Integration tests for container teardown.
//!
//! Covered:
//! 1. Step ordering and short-circuiting, via counting mock collaborators
//! 2. Registry consumption on success and retention on failure
//! 3. Parallel removal of disjoint containers
//! 4. End-to-end removal with the filesystem-backed collaborators
//! 5. Timestamp extraction through the service

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stevedore_common::config::StevedoreConfig;
use stevedore_common::error::{Result, StevedoreError};
use stevedore_common::types::{ContainerId, ContainerState};
use stevedore_runtime::backend::{
    ContainerBackend, ContainerConfig, InspectRecord, InspectState, RemoveOptions, StateBackend,
};
use stevedore_runtime::cleanup::{
    CleanupError, CleanupInfo, HostCleanup, HostResources, PlatformCleanup,
};
use stevedore_runtime::logs::{FsLogSymlinks, LogSymlinks};
use stevedore_runtime::teardown::{RemoveContainerResponse, TeardownError, TeardownService};

// ── Mock collaborators ───────────────────────────────────────────────

#[derive(Default)]
struct MockSymlinks {
    fail: bool,
    calls: AtomicUsize,
}

impl LogSymlinks for MockSymlinks {
    fn remove_container_log_symlink(&self, id: &ContainerId) -> Result<()> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StevedoreError::io(
                format!("/logs/{id}.log"),
                std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
struct MockCleanup {
    errors: Vec<&'static str>,
    calls: AtomicUsize,
}

impl PlatformCleanup for MockCleanup {
    fn cleanup(&self, _info: &CleanupInfo) -> Vec<CleanupError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        self.errors.iter().copied().map(CleanupError::other).collect()
    }
}

#[derive(Default)]
struct MockBackend {
    fail: bool,
    removed: Mutex<Vec<(ContainerId, RemoveOptions)>>,
}

impl MockBackend {
    fn remove_calls(&self) -> Vec<(ContainerId, RemoveOptions)> {
        self.removed.lock().unwrap().clone()
    }
}

impl ContainerBackend for MockBackend {
    fn create(&self, _config: &ContainerConfig) -> Result<ContainerId> {
        Ok(ContainerId::generate())
    }

    fn inspect(&self, id: &ContainerId) -> Result<InspectRecord> {
        Ok(InspectRecord {
            id: id.clone(),
            created: "2024-03-01T10:00:00Z".into(),
            state: InspectState {
                status: "exited".into(),
                started_at: "2024-03-01T10:00:01Z".into(),
                finished_at: "2024-03-01T10:05:00Z".into(),
            },
        })
    }

    fn remove(&self, id: &ContainerId, options: RemoveOptions) -> Result<()> {
        self.removed.lock().unwrap().push((id.clone(), options));
        if self.fail {
            return Err(StevedoreError::Config {
                message: "backend unavailable".into(),
            });
        }
        Ok(())
    }
}

struct Harness {
    symlinks: Arc<MockSymlinks>,
    cleanup: Arc<MockCleanup>,
    backend: Arc<MockBackend>,
    service: TeardownService,
}

fn harness(symlinks: MockSymlinks, cleanup: MockCleanup, backend: MockBackend) -> Harness {
    let symlinks = Arc::new(symlinks);
    let cleanup = Arc::new(cleanup);
    let backend = Arc::new(backend);
    let service = TeardownService::new(backend.clone(), symlinks.clone(), cleanup.clone());
    Harness {
        symlinks,
        cleanup,
        backend,
        service,
    }
}

fn volumes(names: &[&str]) -> CleanupInfo {
    CleanupInfo::Host(HostResources {
        volumes: names.iter().map(ToString::to_string).collect(),
        ..HostResources::default()
    })
}

const FORCED: RemoveOptions = RemoveOptions {
    remove_volumes: true,
    force: true,
};

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn removal_with_metadata_consumes_registry_entry() {
    let h = harness(MockSymlinks::default(), MockCleanup::default(), MockBackend::default());
    let id = ContainerId::new("abc");
    h.service.register_cleanup(id.clone(), volumes(&["v1"]));

    let response = h.service.remove_container(&id).expect("remove");

    assert_eq!(response, RemoveContainerResponse);
    assert!(!h.service.registry().contains(&id));
    assert_eq!(h.cleanup.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.backend.remove_calls(), vec![(id, FORCED)]);
}

#[test]
fn cleanup_failure_aggregates_errors_and_keeps_container() {
    let h = harness(
        MockSymlinks::default(),
        MockCleanup {
            errors: vec!["errA", "errB"],
            ..MockCleanup::default()
        },
        MockBackend::default(),
    );
    let id = ContainerId::new("def");
    h.service.register_cleanup(id.clone(), volumes(&["v1"]));

    let err = h.service.remove_container(&id).unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("errA"), "{msg}");
    assert!(msg.contains("errB"), "{msg}");
    assert!(msg.contains("def"), "{msg}");
    assert!(matches!(&err, TeardownError::PlatformCleanup { errors, .. } if errors.len() == 2));
    assert_eq!(h.service.registry().get(&id), Some(volumes(&["v1"])));
    assert!(h.backend.remove_calls().is_empty());
}

#[test]
fn removal_without_metadata_skips_cleanup() {
    let h = harness(MockSymlinks::default(), MockCleanup::default(), MockBackend::default());
    let id = ContainerId::new("ghi");

    h.service.remove_container(&id).expect("remove");

    assert_eq!(h.symlinks.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.cleanup.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.backend.remove_calls(), vec![(id, FORCED)]);
    assert!(h.service.registry().is_empty());
}

#[test]
fn symlink_failure_short_circuits() {
    let h = harness(
        MockSymlinks {
            fail: true,
            ..MockSymlinks::default()
        },
        MockCleanup::default(),
        MockBackend::default(),
    );
    let id = ContainerId::new("abc");
    h.service.register_cleanup(id.clone(), volumes(&["v1"]));

    let err = h.service.remove_container(&id).unwrap_err();

    assert!(matches!(err, TeardownError::LogSymlink { .. }));
    assert_eq!(h.cleanup.calls.load(Ordering::SeqCst), 0);
    assert!(h.backend.remove_calls().is_empty());
    assert!(h.service.registry().contains(&id));
}

#[test]
fn backend_failure_is_reported_after_cleanup_consumed() {
    let h = harness(
        MockSymlinks::default(),
        MockCleanup::default(),
        MockBackend {
            fail: true,
            ..MockBackend::default()
        },
    );
    let id = ContainerId::new("jkl");
    h.service.register_cleanup(id.clone(), volumes(&["v1"]));

    let err = h.service.remove_container(&id).unwrap_err();

    let msg = err.to_string();
    assert!(matches!(err, TeardownError::Backend { .. }));
    assert!(msg.contains("jkl") && msg.contains("backend unavailable"), "{msg}");
    // Cleanup already succeeded, so a retry only has the backend step left.
    assert!(!h.service.registry().contains(&id));

    let _ = h.service.remove_container(&id).unwrap_err();
    assert_eq!(h.cleanup.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.backend.remove_calls().len(), 2);
}

#[test]
fn disjoint_containers_are_removed_in_parallel() {
    const CONTAINERS: usize = 64;

    let h = harness(MockSymlinks::default(), MockCleanup::default(), MockBackend::default());
    let ids: Vec<_> = (0..CONTAINERS)
        .map(|i| ContainerId::new(format!("c-{i}")))
        .collect();
    for id in &ids {
        h.service.register_cleanup(id.clone(), volumes(&["v"]));
    }

    std::thread::scope(|s| {
        for id in &ids {
            let service = &h.service;
            let _ = s.spawn(move || service.remove_container(id).expect("remove"));
        }
    });

    assert!(h.service.registry().is_empty());
    assert_eq!(h.cleanup.calls.load(Ordering::SeqCst), CONTAINERS);
    assert_eq!(h.backend.remove_calls().len(), CONTAINERS);
}

#[test]
fn timestamps_are_extracted_through_service() {
    let h = harness(MockSymlinks::default(), MockCleanup::default(), MockBackend::default());
    let ts = h
        .service
        .container_timestamps(&ContainerId::new("abc"))
        .expect("timestamps");
    assert!(ts.created < ts.started && ts.started < ts.finished);
}

// ── Filesystem-backed pipeline ───────────────────────────────────────

#[cfg(unix)]
#[test]
fn end_to_end_removal_with_partial_failure_and_retry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StevedoreConfig::with_data_dir(dir.path());
    let backend = Arc::new(StateBackend::from_config(&config));
    let symlinks = Arc::new(FsLogSymlinks::new(config.log_dir.clone()));
    let cleanup = Arc::new(HostCleanup::new(config.scratch_dir.clone()));
    let service = TeardownService::new(backend.clone(), symlinks.clone(), cleanup.clone());

    let id = backend
        .create(&ContainerConfig {
            name: "web".into(),
            image: "nginx".into(),
            volumes: vec!["v1".into()],
        })
        .expect("create");
    backend.transition(&id, ContainerState::Running).expect("start");

    let log_file = dir.path().join("container.log");
    std::fs::write(&log_file, "line\n").expect("log");
    let link = symlinks
        .create_container_log_symlink(&id, &log_file)
        .expect("symlink");

    // A non-empty cgroup directory cannot be rmdir'ed: cleanup fails once.
    let cgroup = dir.path().join("cgroup").join(id.as_str());
    std::fs::create_dir_all(cgroup.join("busy")).expect("cgroup");
    let volume = cleanup.volume_path("v1");
    std::fs::create_dir_all(&volume).expect("volume");
    service.register_cleanup(
        id.clone(),
        CleanupInfo::Host(HostResources {
            volumes: vec!["v1".into()],
            cgroup_dirs: vec![cgroup.clone()],
            ..HostResources::default()
        }),
    );

    let err = service.remove_container(&id).unwrap_err();
    assert!(matches!(err, TeardownError::PlatformCleanup { .. }));
    assert!(std::fs::symlink_metadata(&link).is_err());
    assert!(!volume.exists());
    assert!(service.registry().contains(&id));
    assert!(backend.inspect(&id).is_ok(), "container must survive failed cleanup");

    std::fs::remove_dir(cgroup.join("busy")).expect("free cgroup");
    service.remove_container(&id).expect("retry succeeds");
    assert!(!service.registry().contains(&id));
    assert!(!cgroup.exists());
    assert!(matches!(
        backend.inspect(&id),
        Err(StevedoreError::NotFound { .. })
    ));
}

#[test]
fn malformed_backend_timestamp_names_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StevedoreConfig::with_data_dir(dir.path());
    std::fs::create_dir_all(&config.data_dir).expect("data dir");
    std::fs::write(
        &config.state_file,
        r#"{ "containers": [ {
            "id": "bad", "name": "bad", "image": "busybox", "state": "Exited",
            "created": "03/01/2024", "started_at": "nope", "finished_at": "nope"
        } ] }"#,
    )
    .expect("state");
    let service = TeardownService::from_config(&config);

    let err = service
        .container_timestamps(&ContainerId::new("bad"))
        .unwrap_err();
    assert!(matches!(
        err,
        StevedoreError::InvalidTimestamp { field: "Created", .. }
    ));
}
