pub mod errors;
pub mod events;
pub mod manager;
pub mod poller;
pub mod status;

// Re-export the modules here for easy import elsewhere.
pub use errors::*;
pub use events::*;
pub use manager::*;
pub use poller::*;
pub use status::*;
