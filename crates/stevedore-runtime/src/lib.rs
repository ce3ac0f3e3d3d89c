//! Container teardown for the Stevedore runtime.
//!
//! The [`teardown::TeardownService`] removes a container in three steps:
//! log symlink removal, platform-specific cleanup driven by the
//! [`cleanup::CleanupRegistry`], and backend removal.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod backend;
pub mod cleanup;
pub mod logs;
pub mod state;
pub mod teardown;
pub mod timestamps;
