pub mod errors;
pub mod profile;
pub mod settings;
pub mod store;

// Re-export the modules here for easy import elsewhere.
pub use errors::*;
pub use profile::*;
pub use settings::*;
pub use store::*;
