pub mod build;
pub mod catalog;
pub mod config;

// Re-export command functions for convenience
pub use build::{build, BuildParams};
pub use catalog::{import, stats};
pub use config::show;
