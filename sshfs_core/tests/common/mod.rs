#![allow(dead_code)]

pub mod fake_runner;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::LevelFilter;
use sshfs_core::{ConnectionProfile, MountController, MountManager, ProfileStore, Settings};

use fake_runner::{FakeMountTable, FakeRunner};

/// Logs appear only with `-- --nocapture` or when a test fails.
pub fn init_test_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// `{name:"work", host:"10.0.0.5", username:"alice", remotePath:"/home/alice", localMountPoint:"/mnt/work"}`
pub fn work_profile() -> ConnectionProfile {
    let mut profile = ConnectionProfile::new("work", "10.0.0.5", "alice", "/mnt/work");
    profile.remote_path = "/home/alice".into();
    profile
}

/// Everything a manager test needs, wired to fakes and a scratch store.
pub struct Harness {
    pub manager: MountManager,
    pub runner: FakeRunner,
    pub table: FakeMountTable,
    pub dir: tempfile::TempDir,
}

pub fn harness() -> Harness {
    harness_with_store(|dir| dir.join("connections.json"))
}

/// Like [`harness`], with the store file placed by `store_path` inside the
/// scratch directory.
pub fn harness_with_store(store_path: impl FnOnce(&Path) -> PathBuf) -> Harness {
    init_test_logging();
    let dir = tempfile::tempdir().expect("tempdir");
    let table = FakeMountTable::default();
    let runner = FakeRunner::new(table.clone());
    let controller = MountController::new(
        Arc::new(runner.clone()),
        Arc::new(table.clone()),
        Settings::default(),
    );
    let store = ProfileStore::at(store_path(dir.path()));
    Harness {
        manager: MountManager::new(store, controller),
        runner,
        table,
        dir,
    }
}
