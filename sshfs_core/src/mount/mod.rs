pub mod command;
pub mod controller;
pub mod errors;
pub mod mount_table;
pub mod runner;

// Re-export the modules here for easy import elsewhere.
pub use command::*;
pub use controller::*;
pub use errors::*;
pub use mount_table::*;
pub use runner::*;
