use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};

/// Directory name under the per-user config root (`~/.config/sshfs-gui`).
pub const APP_DIR_NAME: &str = "sshfs-gui";

/// `~/.config/sshfs-gui` on Linux, `%APPDATA%\sshfs-gui\config` on Windows, etc.
pub fn default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_DIR_NAME).map(|proj| proj.config_dir().to_path_buf())
}

/// Expands a leading `~` or `~/` against the current user's home directory.
/// Anything else is returned untouched.
pub fn expand_tilde(raw: &str) -> PathBuf {
    let home = || BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    if raw == "~" {
        if let Some(home) = home() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = home() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Drops trailing separators so `/mnt/work/` and `/mnt/work` compare equal.
pub fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}
