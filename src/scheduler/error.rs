//! Error types for the scheduler module

use thiserror::Error;

use crate::storage::StorageError;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
///
/// An unfilled slot is not an error: it is reported through the gap result.
/// Everything here aborts the current run.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Unknown rotation category token
    #[error("Invalid category '{token}'. Valid options: {}", valid_options.join(", "))]
    InvalidCategory {
        token: String,
        valid_options: Vec<String>,
    },

    /// The rotation order has no categories
    #[error("Rotation order is empty")]
    EmptyRotation,

    /// Gap cannot be scheduled
    #[error("Invalid gap at {start}: {reason}")]
    InvalidGap { start: String, reason: String },

    /// Candidate repository or usage recorder failed
    #[error("Storage failure during '{operation}': {source}")]
    Storage {
        operation: String,
        #[source]
        source: StorageError,
    },
}

impl SchedulerError {
    /// Create an invalid category error
    pub fn invalid_category(token: impl Into<String>) -> Self {
        Self::InvalidCategory {
            token: token.into(),
            valid_options: crate::scheduler::rotation::RotationCategory::all()
                .iter()
                .map(|c| c.id().to_string())
                .collect(),
        }
    }

    /// Create an invalid gap error
    pub fn invalid_gap(start: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidGap {
            start: start.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap a collaborator failure with the operation that hit it
    pub fn storage(operation: impl Into<String>, source: StorageError) -> Self {
        Self::Storage {
            operation: operation.into(),
            source,
        }
    }

    /// Check if the run could be retried as-is
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Storage { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}
