use std::time::Duration;

use sshfs_core::core::{Action, Event};
use sshfs_core::{ConnectionProfile, ManagerError, MountError};
use tokio::sync::broadcast::Receiver;

mod common;
use common::fake_runner::Reply;
use common::{harness, harness_with_store, work_profile};

fn events(rx: &mut Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn store_mutations_are_announced() {
    let h = harness();
    let mut rx = h.manager.subscribe();

    h.manager.add_profile(work_profile()).unwrap();
    let mut renamed = work_profile();
    renamed.name = "office".into();
    h.manager.update_profile("work", renamed).unwrap();
    h.manager.remove_profile("office").unwrap();

    let store_events: Vec<_> = events(&mut rx)
        .into_iter()
        .filter(|e| !matches!(e, Event::StatusChanged { .. }))
        .collect();
    assert_eq!(
        store_events,
        [
            Event::ProfileAdded("work".into()),
            Event::ProfileUpdated {
                old_name: "work".into(),
                new_name: "office".into()
            },
            Event::ProfileRemoved("office".into()),
        ]
    );
}

#[tokio::test]
async fn deleting_a_mounted_profile_is_refused() {
    let h = harness();
    h.manager.add_profile(work_profile()).unwrap();
    h.manager.mount("work").await.unwrap();

    let err = h.manager.remove_profile("work").unwrap_err();
    assert!(matches!(err, ManagerError::ProfileMounted(ref n) if n == "work"));
    let err = h.manager.update_profile("work", work_profile()).unwrap_err();
    assert!(matches!(err, ManagerError::ProfileMounted(_)));
    assert_eq!(h.manager.profiles().len(), 1);

    h.manager.unmount("work").await.unwrap();
    h.manager.remove_profile("work").unwrap();
    assert!(h.manager.profiles().is_empty());
}

#[tokio::test]
async fn failed_mount_keeps_state_and_attaches_detail() {
    let h = harness();
    h.manager.add_profile(work_profile()).unwrap();
    let mut rx = h.manager.subscribe();
    h.runner.push("sshfs", Reply::fail(1, "Permission denied"));

    let err = h.manager.mount("work").await.unwrap_err();
    assert!(matches!(err, ManagerError::Mount(MountError::MountFailed(_))));

    let status = h.manager.status("work");
    assert!(!status.mounted);
    assert_eq!(
        status.detail.as_deref(),
        Some("Mount failed: Permission denied")
    );
    assert!(!h.manager.is_busy("work"));

    let seen = events(&mut rx);
    assert_eq!(
        seen,
        [
            Event::ActionStarted {
                name: "work".into(),
                action: Action::Mount
            },
            Event::ActionFailed {
                name: "work".into(),
                action: Action::Mount,
                message: "Mount failed: Permission denied".into(),
                suggest_force: false,
            },
        ]
    );
}

#[tokio::test]
async fn same_profile_actions_are_serialized() {
    let h = harness();
    h.manager.add_profile(work_profile()).unwrap();
    h.runner.set_delay(Duration::from_millis(200));

    let first = {
        let manager = h.manager.clone();
        tokio::spawn(async move { manager.mount("work").await })
    };
    // Give the first call time to claim the profile.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.manager.is_busy("work"));

    let second = h.manager.mount("work").await.unwrap_err();
    assert!(matches!(second, ManagerError::Busy(_)));
    assert!(matches!(
        h.manager.remove_profile("work"),
        Err(ManagerError::Busy(_))
    ));

    first.await.unwrap().unwrap();
    assert_eq!(h.runner.runs_of("sshfs"), 1);
    assert!(!h.manager.is_busy("work"));
}

#[tokio::test]
async fn different_profiles_mount_concurrently() {
    let h = harness();
    h.manager.add_profile(work_profile()).unwrap();
    h.manager
        .add_profile(ConnectionProfile::new("nas", "nas.local", "bob", "/mnt/nas"))
        .unwrap();
    h.runner.set_delay(Duration::from_millis(100));

    let (a, b) = tokio::join!(h.manager.mount("work"), h.manager.mount("nas"));
    a.unwrap();
    b.unwrap();
    assert!(h.manager.status("work").mounted);
    assert!(h.manager.status("nas").mounted);
}

#[tokio::test]
async fn busy_unmount_offers_force_and_force_succeeds() {
    let h = harness();
    h.manager.add_profile(work_profile()).unwrap();
    h.manager.mount("work").await.unwrap();
    h.runner.push("fusermount", Reply::fail(1, "Device or resource busy"));
    h.runner.push("umount", Reply::fail(32, "umount: /mnt/work: target is busy."));
    let mut rx = h.manager.subscribe();

    assert!(h.manager.unmount("work").await.is_err());
    assert!(h.manager.status("work").mounted);
    let suggested = events(&mut rx).into_iter().any(|e| {
        matches!(e, Event::ActionFailed { suggest_force: true, action: Action::Unmount, .. })
    });
    assert!(suggested);

    h.manager.force_unmount("work").await.unwrap();
    assert!(!h.manager.status("work").mounted);
}

#[tokio::test]
async fn unknown_profile_actions_fail_cleanly() {
    let h = harness();
    assert!(matches!(
        h.manager.mount("ghost").await,
        Err(ManagerError::UnknownProfile(_))
    ));
    assert!(matches!(
        h.manager.remove_profile("ghost"),
        Err(ManagerError::UnknownProfile(_))
    ));
}

#[tokio::test]
async fn validation_errors_are_exposed_for_forms() {
    let h = harness();
    let mut p = work_profile();
    p.username.clear();
    let err = h.manager.add_profile(p).unwrap_err();
    assert!(err.validation().is_some());
    assert!(h.manager.profiles().is_empty());
}

#[tokio::test]
async fn unwritable_store_keeps_edits_for_the_session() {
    let h = harness_with_store(|dir| {
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "").expect("blocker file");
        blocker.join("connections.json")
    });
    let mut rx = h.manager.subscribe();

    let err = h.manager.add_profile(work_profile()).unwrap_err();
    assert!(err.is_unsaved());
    assert!(err.validation().is_none());
    assert_eq!(h.manager.profiles().len(), 1);
    assert!(events(&mut rx).contains(&Event::ProfileAdded("work".into())));

    // Invalid input is still refused outright.
    let dup = h.manager.add_profile(work_profile()).unwrap_err();
    assert!(dup.validation().is_some());
    assert_eq!(h.manager.profiles().len(), 1);

    h.manager.mount("work").await.unwrap();
    assert!(h.manager.status("work").mounted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn removal_never_slips_past_a_starting_mount() {
    for round in 0..100 {
        let h = harness();
        h.manager.add_profile(work_profile()).unwrap();
        h.runner.set_delay(Duration::from_millis(1));

        let mount = {
            let manager = h.manager.clone();
            tokio::spawn(async move { manager.mount("work").await })
        };
        let remove = {
            let manager = h.manager.clone();
            tokio::task::spawn_blocking(move || manager.remove_profile("work"))
        };
        let mounted = mount.await.unwrap();
        let removed = remove.await.unwrap();
        assert!(
            !(mounted.is_ok() && removed.is_ok()),
            "round {round}: profile removed while its mount ran"
        );
    }
}

#[tokio::test]
async fn a_running_mount_counts_as_active() {
    let h = harness();
    h.manager.add_profile(work_profile()).unwrap();
    h.manager
        .add_profile(ConnectionProfile::new("nas", "nas.local", "bob", "/mnt/nas"))
        .unwrap();
    assert!(h.manager.active_profiles().is_empty());

    h.runner.set_delay(Duration::from_millis(200));
    let pending = {
        let manager = h.manager.clone();
        tokio::spawn(async move { manager.mount("work").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!h.manager.status("work").mounted);
    assert_eq!(h.manager.active_profiles(), ["work"]);

    // Waits for the mount to land, then takes it down again.
    h.manager.unmount_when_idle("work").await.unwrap();
    pending.await.unwrap().unwrap();
    assert!(!h.manager.status("work").mounted);
    assert!(h.manager.active_profiles().is_empty());
}
