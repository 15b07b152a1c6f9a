use std::path::Path;

use log::warn;
use sshfs_core::{MountController, MountManager, ProfileStore, Settings, StoreError};

/// What both front ends need after startup.
pub struct AppContext {
    pub manager: MountManager,
    pub settings: Settings,
    /// Set when the store could not be read; the app still starts, empty.
    pub load_warning: Option<String>,
}

/// Loads settings and profiles from `config_dir` (or the per-user default)
/// and wires the manager to the real mount tools.
pub fn bootstrap(config_dir: Option<&Path>) -> Result<AppContext, StoreError> {
    let settings = Settings::load_from(config_dir);
    let (store, load_error) = ProfileStore::open_in(config_dir)?;
    let load_warning = load_error.map(|e| {
        warn!("{e}");
        format!("Failed to load connections: {e}")
    });
    let controller = MountController::system(settings.clone());
    Ok(AppContext {
        manager: MountManager::new(store, controller),
        settings,
        load_warning,
    })
}

/// Shown once when the mount tool cannot be found.
pub fn tool_missing_message(tool: &str) -> String {
    format!(
        "{tool} is not installed on this system. Install it with \
         `sudo apt install sshfs` (Debian/Ubuntu), `sudo dnf install fuse-sshfs` \
         (Fedora) or `sudo pacman -S sshfs` (Arch)."
    )
}
