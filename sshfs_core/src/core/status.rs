use std::collections::{HashMap, HashSet};

use log::debug;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::events::Event;

/// Derived, never persisted: is the profile mounted, plus the last error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountStatus {
    pub mounted: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Default)]
struct Entry {
    status: MountStatus,
    /// Bumped by every action result so stale poll samples can be dropped.
    epoch: u64,
}

/// The single place mount state is recorded, by action results and poll
/// ticks alike. Emits [`Event::StatusChanged`] on edges only.
#[derive(Debug)]
pub struct StatusBoard {
    entries: Mutex<HashMap<String, Entry>>,
    events: broadcast::Sender<Event>,
}

impl StatusBoard {
    pub fn new(events: broadcast::Sender<Event>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn get(&self, name: &str) -> Option<MountStatus> {
        self.entries.lock().get(name).map(|e| e.status.clone())
    }

    pub fn epoch(&self, name: &str) -> u64 {
        self.entries.lock().get(name).map_or(0, |e| e.epoch)
    }

    /// Records a poll sample. Ignored when an action result landed after
    /// the sample was taken (`epoch` moved on). Returns whether it emitted.
    pub fn observe_sample(&self, name: &str, mounted: bool, epoch: u64) -> bool {
        let mut entries = self.entries.lock();
        let current = entries.get(name).map_or(0, |e| e.epoch);
        if current != epoch {
            debug!("Dropping stale sample for '{name}'");
            return false;
        }
        self.apply(&mut entries, name, mounted, false)
    }

    /// Records the outcome of a completed action. Returns whether it emitted.
    pub fn observe_action(&self, name: &str, mounted: bool) -> bool {
        let mut entries = self.entries.lock();
        self.apply(&mut entries, name, mounted, true)
    }

    /// Attaches an error to the profile without touching its mounted flag.
    pub fn record_failure(&self, name: &str, message: impl Into<String>) {
        let mut entries = self.entries.lock();
        let entry = entries.entry(name.to_owned()).or_default();
        entry.status.detail = Some(message.into());
        entry.epoch += 1;
    }

    pub fn clear_detail(&self, name: &str) {
        if let Some(entry) = self.entries.lock().get_mut(name) {
            entry.status.detail = None;
        }
    }

    pub fn rename(&self, old: &str, new: &str) {
        if old == new {
            return;
        }
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.remove(old) {
            entries.insert(new.to_owned(), entry);
        }
    }

    pub fn forget(&self, name: &str) {
        self.entries.lock().remove(name);
    }

    /// Drops every entry whose name is not in `names`.
    pub fn retain(&self, names: &HashSet<String>) {
        self.entries.lock().retain(|name, _| names.contains(name));
    }

    fn apply(
        &self,
        entries: &mut HashMap<String, Entry>,
        name: &str,
        mounted: bool,
        from_action: bool,
    ) -> bool {
        let first = !entries.contains_key(name);
        let entry = entries.entry(name.to_owned()).or_default();
        if from_action {
            entry.epoch += 1;
        }
        if !first && entry.status.mounted == mounted {
            return false;
        }
        entry.status.mounted = mounted;
        entry.status.detail = None;
        let _ = self.events.send(Event::StatusChanged {
            name: name.to_owned(),
            status: entry.status.clone(),
        });
        true
    }
}
