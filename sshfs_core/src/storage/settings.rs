use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::utils::paths::default_config_dir;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Application-wide knobs, read from `settings.json` next to the store.
/// Every field has a default so a partial or missing file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub poll_interval_secs: u64,
    pub mount_tool: String,
    /// Tried in order until one succeeds.
    pub unmount_tools: Vec<String>,
    pub mount_timeout_secs: u64,
    pub unmount_timeout_secs: u64,
    /// Append `-o reconnect` to every mount.
    pub reconnect: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            mount_tool: "sshfs".to_owned(),
            unmount_tools: vec!["fusermount".to_owned(), "umount".to_owned()],
            mount_timeout_secs: 30,
            unmount_timeout_secs: 10,
            reconnect: true,
        }
    }
}

impl Settings {
    /// Reads `settings.json` from `config_dir` (or the per-user default).
    /// Missing or malformed files fall back to defaults.
    pub fn load_from(config_dir: Option<&Path>) -> Self {
        let Some(path) = Self::path_in(config_dir) else {
            return Self::default();
        };
        match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(settings) => {
                    debug!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Ignoring malformed settings {:?}: {e}", path);
                    Self::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!("Could not read settings {:?}: {e}", path);
                Self::default()
            }
        }
    }

    pub fn path_in(config_dir: Option<&Path>) -> Option<PathBuf> {
        config_dir
            .map(Path::to_path_buf)
            .or_else(default_config_dir)
            .map(|dir| dir.join(SETTINGS_FILE_NAME))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn mount_timeout(&self) -> Duration {
        Duration::from_secs(self.mount_timeout_secs)
    }

    pub fn unmount_timeout(&self) -> Duration {
        Duration::from_secs(self.unmount_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let s: Settings = serde_json::from_str(r#"{"poll_interval_secs": 2}"#).unwrap();
        assert_eq!(s.poll_interval(), Duration::from_secs(2));
        assert_eq!(s.mount_tool, "sshfs");
        assert!(s.reconnect);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE_NAME), "{ nope").unwrap();
        assert_eq!(Settings::load_from(Some(dir.path())), Settings::default());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let s = Settings {
            poll_interval_secs: 0,
            ..Settings::default()
        };
        assert_eq!(s.poll_interval(), Duration::from_secs(1));
    }
}
