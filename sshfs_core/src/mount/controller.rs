use std::{path::Path, sync::Arc, sync::OnceLock};

use log::{debug, info, warn};

use super::command::{mount_invocation, unmount_invocations};
use super::errors::MountError;
use super::mount_table::{MountTable, ProcMounts};
use super::runner::{CommandRunner, SystemRunner};
use crate::storage::{ConnectionProfile, Settings};

/// How an unmount request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmountOutcome {
    Unmounted,
    /// Nothing was mounted there; no tool was run.
    NotMounted,
}

/// Turns profiles into mount-tool invocations and answers mount-state
/// queries.
///
/// The controller itself does not serialize actions; callers that may
/// issue concurrent actions for the same profile go through
/// [`crate::core::MountManager`].
pub struct MountController {
    runner: Arc<dyn CommandRunner>,
    table: Arc<dyn MountTable>,
    settings: Settings,
    tool_available: OnceLock<bool>,
}

impl MountController {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        table: Arc<dyn MountTable>,
        settings: Settings,
    ) -> Self {
        Self {
            runner,
            table,
            settings,
            tool_available: OnceLock::new(),
        }
    }

    /// Real subprocesses and `/proc/self/mounts`.
    pub fn system(settings: Settings) -> Self {
        Self::new(
            Arc::new(SystemRunner),
            Arc::new(ProcMounts::default()),
            settings,
        )
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mount_table(&self) -> Arc<dyn MountTable> {
        Arc::clone(&self.table)
    }

    /// Mounts `profile`, creating its mount point first if needed.
    ///
    /// `Ok(())` means the tool exited 0 and the profile is now mounted.
    pub async fn mount(&self, profile: &ConnectionProfile) -> Result<(), MountError> {
        let mount_point = profile.mount_point();
        self.table
            .prepare_mount_point(&mount_point)
            .map_err(|source| MountError::MountPointCreation {
                path: mount_point.clone(),
                source,
            })?;

        if self.is_mounted(&mount_point) {
            return Err(MountError::AlreadyMounted(mount_point));
        }

        let invocation = mount_invocation(profile, &self.settings);
        info!("Mounting '{}': {}", profile.name, invocation);
        let output = self.runner.run(&invocation).await?;
        if output.success() {
            info!("Mounted '{}' on {:?}", profile.name, mount_point);
            Ok(())
        } else {
            let message = output.diagnostic();
            warn!("Mount of '{}' failed: {}", profile.name, message);
            Err(MountError::MountFailed(message))
        }
    }

    /// Unmounts `profile`, trying each configured unmount tool in turn.
    pub async fn unmount(&self, profile: &ConnectionProfile) -> Result<UnmountOutcome, MountError> {
        self.unmount_with(profile, false).await
    }

    /// Lazy unmount. Only ever run on explicit user request: pending remote
    /// writes may be lost.
    pub async fn force_unmount(
        &self,
        profile: &ConnectionProfile,
    ) -> Result<UnmountOutcome, MountError> {
        self.unmount_with(profile, true).await
    }

    async fn unmount_with(
        &self,
        profile: &ConnectionProfile,
        force: bool,
    ) -> Result<UnmountOutcome, MountError> {
        let mount_point = profile.mount_point();
        if !self.is_mounted(&mount_point) {
            debug!("'{}' is not mounted; nothing to do", profile.name);
            return Ok(UnmountOutcome::NotMounted);
        }

        let mut last_failure: Option<String> = None;
        let mut first_missing: Option<String> = None;
        for invocation in unmount_invocations(&mount_point, &self.settings, force) {
            info!("Unmounting '{}': {}", profile.name, invocation);
            match self.runner.run(&invocation).await {
                Ok(output) if output.success() => {
                    info!("Unmounted '{}'", profile.name);
                    return Ok(UnmountOutcome::Unmounted);
                }
                Ok(output) => {
                    let message = output.diagnostic();
                    debug!("'{}' failed: {}", invocation.program, message);
                    last_failure = Some(message);
                }
                Err(MountError::ToolUnavailable(tool)) => {
                    debug!("'{tool}' not available, trying the next unmount tool");
                    first_missing.get_or_insert(tool);
                }
                Err(e) => return Err(e),
            }
        }

        match (last_failure, first_missing) {
            (Some(message), _) => {
                warn!("Unmount of '{}' failed: {}", profile.name, message);
                Err(MountError::UnmountFailed(message))
            }
            (None, Some(tool)) => Err(MountError::ToolUnavailable(tool)),
            (None, None) => Err(MountError::UnmountFailed(
                "no unmount tool configured".to_owned(),
            )),
        }
    }

    /// Whether something is mounted at `path` right now. Never fails.
    pub fn is_mounted(&self, path: &Path) -> bool {
        self.table.is_mounted(path)
    }

    /// Whether the mount tool resolves on `PATH`. Checked once per
    /// controller.
    pub fn external_tool_available(&self) -> bool {
        *self.tool_available.get_or_init(|| {
            let found = self.runner.resolve(&self.settings.mount_tool);
            if !found {
                warn!("'{}' was not found on PATH", self.settings.mount_tool);
            }
            found
        })
    }
}
