//! Unified error handling for the airtime crate
//!
//! Each module keeps its own error enum. [`Error`] wraps them for entry points
//! that cross module boundaries, such as loading a gap file and building a
//! schedule from it, so callers can hold a single type while still
//! classifying failures.
//!
//! # Usage
//!
//! ```rust,ignore
//! use airtime::error::{AirtimeErrorTrait, Error};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying after {}", err.category().description());
//!     } else {
//!         eprintln!("Fatal error: {}", err);
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::scheduler::error::SchedulerError;
pub use crate::storage::error::StorageError;

/// Common interface implemented by the crate-level error type
pub trait AirtimeErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration loading and validation
    Config,
    /// Catalog storage
    Storage,
    /// Schedule building
    Scheduler,
    /// File and stream I/O
    Io,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Config => "configuration error",
            Self::Storage => "storage error",
            Self::Scheduler => "scheduler error",
            Self::Io => "I/O error",
            Self::Other => "other error",
        }
    }
}

/// Unified error type for the airtime crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed gap files
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AirtimeErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Storage(e) => e.is_recoverable(),
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Config(_) | Self::Json(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Scheduler(SchedulerError::Storage { .. }) => ErrorCategory::Storage,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
            Self::Io(_) => ErrorCategory::Io,
            Self::Json(_) => ErrorCategory::Other,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
