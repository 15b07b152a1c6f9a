use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A profile field that must not be blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Host,
    Username,
    RemotePath,
    LocalMountPoint,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Connection name",
            Field::Host => "Host",
            Field::Username => "Username",
            Field::RemotePath => "Remote path",
            Field::LocalMountPoint => "Local mount point",
        }
    }
}

/// A profile violates one of the store invariants. Nothing was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{} is required", .0.label())]
    MissingField(Field),
    #[error("port must be between 1 and 65535")]
    InvalidPort,
    #[error("local mount point must be an absolute path: {0}")]
    RelativeMountPoint(String),
    #[error("a connection named '{0}' already exists")]
    DuplicateName(String),
    #[error("mount point {path} is already used by '{other}'")]
    DuplicateMountPoint { path: String, other: String },
}

impl ValidationError {
    /// The form field the error belongs to, if any.
    pub fn field(&self) -> Option<Field> {
        match self {
            ValidationError::MissingField(field) => Some(*field),
            ValidationError::InvalidPort => None,
            ValidationError::DuplicateName(_) => Some(Field::Name),
            ValidationError::RelativeMountPoint(_) | ValidationError::DuplicateMountPoint { .. } => {
                Some(Field::LocalMountPoint)
            }
        }
    }
}

/// Errors raised by [`crate::storage::ProfileStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed store file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The change was applied in memory but writing it to disk failed.
    #[error("change kept for this session but not saved to {path}: {source}")]
    Unsaved {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Stored entries that were skipped on open, one description each.
    #[error("skipped invalid stored connection(s): {}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("no connection named '{0}'")]
    NotFound(String),
    #[error("unable to locate the user config directory")]
    NoConfigDir,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the mutation took effect and only persisting it failed.
    pub fn is_unsaved(&self) -> bool {
        matches!(self, StoreError::Unsaved { .. })
    }
}
