use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use super::errors::ManagerError;
use super::events::{Action, Event};
use super::status::{MountStatus, StatusBoard};
use crate::mount::{MountController, MountError, MountTable, UnmountOutcome};
use crate::storage::{ConnectionProfile, ProfileStore, StoreError};

const EVENT_CAPACITY: usize = 256;
const IDLE_RETRY: Duration = Duration::from_millis(100);

/// A profile as the poller needs it: where to look, and the board epoch at
/// the time the target list was taken.
#[derive(Debug, Clone)]
pub struct PollTarget {
    pub name: String,
    pub mount_point: PathBuf,
    pub epoch: u64,
}

struct Inner {
    store: RwLock<ProfileStore>,
    controller: MountController,
    board: StatusBoard,
    in_flight: Mutex<HashSet<String>>,
    events: broadcast::Sender<Event>,
}

/// Owns the profile store, the mount controller and the status board, and
/// is the only way the UI touches any of them.
///
/// Cloning is cheap (an `Arc` bump), so the window, the poller and every
/// spawned action task hold their own handle. Mount and unmount for the
/// same profile never overlap: a second request while one is running fails
/// with [`ManagerError::Busy`]. Different profiles run independently.
#[derive(Clone)]
pub struct MountManager {
    inner: Arc<Inner>,
}

/// Marks a profile busy for as long as it lives.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    name: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.name);
    }
}

impl MountManager {
    pub fn new(store: ProfileStore, controller: MountController) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store: RwLock::new(store),
                controller,
                board: StatusBoard::new(events.clone()),
                in_flight: Mutex::new(HashSet::new()),
                events,
            }),
        }
    }

    /// Subscribe to store and status notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    pub fn profiles(&self) -> Vec<ConnectionProfile> {
        self.inner.store.read().profiles().to_vec()
    }

    pub fn profile(&self, name: &str) -> Option<ConnectionProfile> {
        self.inner.store.read().get(name).cloned()
    }

    pub fn store_path(&self) -> PathBuf {
        self.inner.store.read().path().to_path_buf()
    }

    /// Last recorded status; unknown profiles read as not mounted.
    pub fn status(&self, name: &str) -> MountStatus {
        self.inner.board.get(name).unwrap_or_default()
    }

    pub fn is_busy(&self, name: &str) -> bool {
        self.inner.in_flight.lock().contains(name)
    }

    /// Profiles that are mounted or have a mount or unmount running, in
    /// store order.
    pub fn active_profiles(&self) -> Vec<String> {
        self.profiles()
            .into_iter()
            .filter(|p| self.is_busy(&p.name) || self.status(&p.name).mounted)
            .map(|p| p.name)
            .collect()
    }

    /// Waits for any running action on `name` to finish, then unmounts it.
    pub async fn unmount_when_idle(&self, name: &str) -> Result<(), ManagerError> {
        loop {
            match self.unmount(name).await {
                Err(ManagerError::Busy(_)) => tokio::time::sleep(IDLE_RETRY).await,
                other => return other,
            }
        }
    }

    pub fn is_mounted(&self, path: &Path) -> bool {
        self.inner.controller.is_mounted(path)
    }

    pub fn mount_table(&self) -> Arc<dyn MountTable> {
        self.inner.controller.mount_table()
    }

    pub fn external_tool_available(&self) -> bool {
        self.inner.controller.external_tool_available()
    }

    pub fn mount_tool(&self) -> String {
        self.inner.controller.settings().mount_tool.clone()
    }

    /// Validates and appends a profile. An [`ManagerError::is_unsaved`]
    /// error means the profile was added but could not be written to disk.
    pub fn add_profile(&self, profile: ConnectionProfile) -> Result<(), ManagerError> {
        let profile = profile.normalized();
        let name = profile.name.clone();
        let unsaved = kept(self.inner.store.write().add(profile))?;
        info!("Added connection '{name}'");
        self.emit(Event::ProfileAdded(name.clone()));
        self.sample(&name);
        unsaved.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Replaces (and possibly renames) a profile. Refused while the profile
    /// is mounted or has an action running.
    pub fn update_profile(
        &self,
        name: &str,
        profile: ConnectionProfile,
    ) -> Result<(), ManagerError> {
        let (_, claim) = self.claim_idle(name)?;
        let profile = profile.normalized();
        let new_name = profile.name.clone();
        let unsaved = kept(self.inner.store.write().update(name, profile))?;
        self.inner.board.rename(name, &new_name);
        drop(claim);
        info!("Updated connection '{name}' -> '{new_name}'");
        self.emit(Event::ProfileUpdated {
            old_name: name.to_owned(),
            new_name: new_name.clone(),
        });
        self.sample(&new_name);
        unsaved.map_or(Ok(()), |e| Err(e.into()))
    }

    /// Deletes a profile. Refused while it is mounted or has an action
    /// running; the user has to unmount first.
    pub fn remove_profile(&self, name: &str) -> Result<ConnectionProfile, ManagerError> {
        let (removed, _claim) = self.claim_idle(name)?;
        let unsaved = kept(self.inner.store.write().remove(name))?;
        self.inner.board.forget(name);
        info!("Removed connection '{name}'");
        self.emit(Event::ProfileRemoved(name.to_owned()));
        match unsaved {
            Some(e) => Err(e.into()),
            None => Ok(removed),
        }
    }

    pub async fn mount(&self, name: &str) -> Result<(), ManagerError> {
        let (profile, _guard) = self.begin(name, Action::Mount)?;
        let result = self.inner.controller.mount(&profile).await;
        self.finish(name, Action::Mount, result.map(|()| true))
    }

    pub async fn unmount(&self, name: &str) -> Result<(), ManagerError> {
        let (profile, _guard) = self.begin(name, Action::Unmount)?;
        let result = self.inner.controller.unmount(&profile).await;
        self.finish(name, Action::Unmount, result.map(unmounted_flag))
    }

    /// Lazy unmount. Only for an explicit user retry after a busy unmount.
    pub async fn force_unmount(&self, name: &str) -> Result<(), ManagerError> {
        let (profile, _guard) = self.begin(name, Action::ForceUnmount)?;
        let result = self.inner.controller.force_unmount(&profile).await;
        self.finish(name, Action::ForceUnmount, result.map(unmounted_flag))
    }

    /// What the poller should look at on this tick.
    pub fn poll_targets(&self) -> Vec<PollTarget> {
        let store = self.inner.store.read();
        store
            .profiles()
            .iter()
            .map(|p| PollTarget {
                name: p.name.clone(),
                mount_point: p.mount_point(),
                epoch: self.inner.board.epoch(&p.name),
            })
            .collect()
    }

    /// Applies one tick of samples. Profiles with an action in flight or
    /// deleted since the targets were taken are skipped. Returns the number
    /// of status changes emitted.
    pub fn apply_samples(&self, samples: Vec<(PollTarget, bool)>) -> usize {
        let names: HashSet<String> = self
            .inner
            .store
            .read()
            .profiles()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        self.inner.board.retain(&names);

        let mut changed = 0;
        for (target, mounted) in samples {
            if !names.contains(&target.name) || self.is_busy(&target.name) {
                continue;
            }
            if self
                .inner
                .board
                .observe_sample(&target.name, mounted, target.epoch)
            {
                debug!("'{}' is now mounted={}", target.name, mounted);
                changed += 1;
            }
        }
        changed
    }

    /// Samples every profile inline and applies the results.
    pub fn refresh_now(&self) -> usize {
        let table = self.mount_table();
        let samples = self
            .poll_targets()
            .into_iter()
            .map(|t| {
                let mounted = table.is_mounted(&t.mount_point);
                (t, mounted)
            })
            .collect();
        self.apply_samples(samples)
    }

    fn sample(&self, name: &str) {
        if let Some(target) = self.poll_targets().into_iter().find(|t| t.name == name) {
            let mounted = self.is_mounted(&target.mount_point);
            self.apply_samples(vec![(target, mounted)]);
        }
    }

    /// Marks `name` busy, or `None` when something already holds it.
    fn claim(&self, name: &str) -> Option<InFlight<'_>> {
        if !self.inner.in_flight.lock().insert(name.to_owned()) {
            return None;
        }
        Some(InFlight {
            set: &self.inner.in_flight,
            name: name.to_owned(),
        })
    }

    /// Holds `name` for a store edit so no mount or unmount can start
    /// until the returned claim is dropped.
    fn claim_idle(
        &self,
        name: &str,
    ) -> Result<(ConnectionProfile, InFlight<'_>), ManagerError> {
        let claim = self
            .claim(name)
            .ok_or_else(|| ManagerError::Busy(name.to_owned()))?;
        let profile = self
            .profile(name)
            .ok_or_else(|| ManagerError::UnknownProfile(name.to_owned()))?;
        if self.is_mounted(&profile.mount_point()) {
            return Err(ManagerError::ProfileMounted(name.to_owned()));
        }
        Ok((profile, claim))
    }

    fn begin(
        &self,
        name: &str,
        action: Action,
    ) -> Result<(ConnectionProfile, InFlight<'_>), ManagerError> {
        // Claim before the lookup so a concurrent removal is either fully
        // before or fully after this action.
        let Some(guard) = self.claim(name) else {
            debug!("Refusing {action} of '{name}': already busy");
            return Err(ManagerError::Busy(name.to_owned()));
        };
        let profile = self
            .profile(name)
            .ok_or_else(|| ManagerError::UnknownProfile(name.to_owned()))?;
        self.inner.board.clear_detail(name);
        self.emit(Event::ActionStarted {
            name: name.to_owned(),
            action,
        });
        Ok((profile, guard))
    }

    fn finish(
        &self,
        name: &str,
        action: Action,
        result: Result<bool, MountError>,
    ) -> Result<(), ManagerError> {
        match result {
            Ok(mounted) => {
                self.inner.board.observe_action(name, mounted);
                self.emit(Event::ActionSucceeded {
                    name: name.to_owned(),
                    action,
                });
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                warn!("{action} of '{name}' failed: {message}");
                self.inner.board.record_failure(name, &message);
                self.emit(Event::ActionFailed {
                    name: name.to_owned(),
                    action,
                    message,
                    suggest_force: action == Action::Unmount && e.suggests_force(),
                });
                Err(e.into())
            }
        }
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine: the CLI often runs without one.
        let _ = self.inner.events.send(event);
    }
}

fn unmounted_flag(_: UnmountOutcome) -> bool {
    false
}

/// Splits a store result into "applied" (possibly unsaved) and "refused".
fn kept<T>(result: Result<T, StoreError>) -> Result<Option<StoreError>, ManagerError> {
    match result {
        Ok(_) => Ok(None),
        Err(e) if e.is_unsaved() => Ok(Some(e)),
        Err(e) => Err(e.into()),
    }
}
