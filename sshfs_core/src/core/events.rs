use std::fmt;

use super::status::MountStatus;

/// A user-triggered mount-state action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Mount,
    Unmount,
    ForceUnmount,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Mount => "mount",
            Action::Unmount => "unmount",
            Action::ForceUnmount => "force unmount",
        })
    }
}

/// Notifications broadcast by [`crate::core::MountManager`] to every
/// subscriber (window, CLI watcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ProfileAdded(String),
    ProfileUpdated { old_name: String, new_name: String },
    ProfileRemoved(String),
    /// Emitted only when the mounted flag differs from the last observation.
    StatusChanged { name: String, status: MountStatus },
    ActionStarted { name: String, action: Action },
    ActionSucceeded { name: String, action: Action },
    ActionFailed {
        name: String,
        action: Action,
        message: String,
        /// The failure looks like a busy mount point; offer a forced retry.
        suggest_force: bool,
    },
}
