use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the external mount and unmount tools.
///
/// None of these are fatal: they are reported against the profile that
/// triggered them and its mount state is left as it was.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("'{0}' was not found; is it installed?")]
    ToolUnavailable(String),
    #[error("Mount failed: {0}")]
    MountFailed(String),
    #[error("Unmount failed: {0}")]
    UnmountFailed(String),
    #[error("Mount point {} is already in use", .0.display())]
    AlreadyMounted(PathBuf),
    #[error("'{tool}' timed out after {secs}s")]
    TimedOut { tool: String, secs: u64 },
    #[error("Failed to create mount point {}: {source}", .path.display())]
    MountPointCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to run '{tool}': {source}")]
    Io {
        tool: String,
        #[source]
        source: io::Error,
    },
}

impl MountError {
    /// An unmount that failed because the mount point is in use can be
    /// retried as a forced (lazy) unmount.
    pub fn suggests_force(&self) -> bool {
        matches!(self, MountError::UnmountFailed(msg) if msg.contains("busy"))
    }
}
