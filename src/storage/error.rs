//! Error types for the storage module

use thiserror::Error;

/// Result type for catalog and recorder operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Catalog and usage-recorder errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Backend temporarily unusable (busy, locked, offline)
    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    /// A thread panicked while holding the connection
    #[error("Storage lock poisoned")]
    LockPoisoned,

    /// Stored row could not be decoded
    #[error("Corrupt {field} for asset '{asset_id}': {value}")]
    Corrupt {
        asset_id: String,
        field: &'static str,
        value: String,
    },

    /// Placement recorded for an asset the catalog does not know
    #[error("Unknown asset '{id}'")]
    UnknownAsset { id: String },

    /// Catalog file could not be read or decoded
    #[error("Import failed: {0}")]
    Import(String),
}

impl StorageError {
    /// Create an unavailable error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a corrupt-row error
    pub fn corrupt(asset_id: impl Into<String>, field: &'static str, value: impl ToString) -> Self {
        Self::Corrupt {
            asset_id: asset_id.into(),
            field,
            value: value.to_string(),
        }
    }

    /// Check if retrying the operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_recoverable() {
        assert!(StorageError::unavailable("database is locked").is_recoverable());
        assert!(!StorageError::LockPoisoned.is_recoverable());
    }

    #[test]
    fn test_corrupt_display() {
        let err = StorageError::corrupt("a-1", "last_scheduled_at", "yesterday");
        let msg = err.to_string();
        assert!(msg.contains("a-1"));
        assert!(msg.contains("last_scheduled_at"));
    }
}
