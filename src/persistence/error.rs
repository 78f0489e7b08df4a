//! Persistence error taxonomy
//!
//! Absent chunks and worlds are `Ok(None)`, never an error. Everything here is
//! either a backend that could not do its job or data that cannot be trusted.

use thiserror::Error;

use crate::persistence::metadata::WorldId;

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors that can occur during persistence operations
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Quota, permission or transport failure. Callers keep data dirty and retry.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored bytes that cannot be decoded into a valid value
    #[error("Corrupted data: {0}")]
    CorruptData(String),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("World {0} not found")]
    WorldNotFound(WorldId),
}

impl PersistenceError {
    /// Whether retrying the same call later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, PersistenceError::BackendUnavailable(_) | PersistenceError::Io(_))
    }
}

impl From<bincode::Error> for PersistenceError {
    fn from(err: bincode::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

/// Create a corrupted data error
pub fn corrupted_data(reason: impl Into<String>) -> PersistenceError {
    PersistenceError::CorruptData(reason.into())
}

/// Create a version mismatch error
pub fn version_mismatch(expected: u32, found: u32) -> PersistenceError {
    PersistenceError::VersionMismatch { expected, found }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(PersistenceError::BackendUnavailable("quota".into()).is_transient());
        assert!(!corrupted_data("bad magic").is_transient());
        assert!(!version_mismatch(1, 2).is_transient());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            version_mismatch(1, 999).to_string(),
            "Version mismatch: expected 1, found 999"
        );
        assert_eq!(corrupted_data("short").to_string(), "Corrupted data: short");
    }
}
