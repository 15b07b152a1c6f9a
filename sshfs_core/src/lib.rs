pub mod core;
pub mod mount;
pub mod storage;
pub mod utils;

// re‑export ergonomic entry points
pub use crate::core::{Action, Event, ManagerError, MountManager, MountStatus, StatusPoller};
pub use mount::{MountController, MountError};
pub use storage::{ConnectionProfile, ProfileStore, Settings, StoreError, ValidationError};
