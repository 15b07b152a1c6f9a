use thiserror::Error;

use crate::mount::MountError;
use crate::storage::{StoreError, ValidationError};

/// Everything a [`crate::core::MountManager`] operation can fail with.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mount(#[from] MountError),
    #[error("no connection named '{0}'")]
    UnknownProfile(String),
    #[error("'{0}' is busy; wait for the running mount or unmount to finish")]
    Busy(String),
    #[error("'{0}' is mounted; unmount it first")]
    ProfileMounted(String),
}

impl ManagerError {
    /// The validation failure behind this error, for inline form display.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            ManagerError::Store(StoreError::Validation(v)) => Some(v),
            _ => None,
        }
    }

    /// The edit took effect for this session but was not written to disk.
    pub fn is_unsaved(&self) -> bool {
        matches!(self, ManagerError::Store(e) if e.is_unsaved())
    }
}
