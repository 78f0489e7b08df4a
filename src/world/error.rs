use crate::persistence::{PersistenceError, WorldId};

/// Errors from the procedural generator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation aborted after {processed} expansions")]
    Aborted { processed: usize },
}

/// Errors from world-level operations
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Cannot delete the active world {0}")]
    ActiveWorldDeletion(WorldId),

    #[error("No world is active")]
    NoActiveWorld,
}

impl WorldError {
    /// Whether the failure came from a backend that may recover on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, WorldError::Persistence(e) if e.is_transient())
    }
}

pub type WorldResult<T> = Result<T, WorldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_errors_convert() {
        let error: WorldError = PersistenceError::CorruptData("bad".to_string()).into();
        assert!(matches!(error, WorldError::Persistence(PersistenceError::CorruptData(_))));
        assert_eq!(error.to_string(), PersistenceError::CorruptData("bad".to_string()).to_string());
    }

    #[test]
    fn test_transient_follows_backend_error() {
        let unavailable: WorldError =
            PersistenceError::BackendUnavailable("offline".to_string()).into();
        let corrupt: WorldError = PersistenceError::CorruptData("bad".to_string()).into();
        assert!(unavailable.is_transient());
        assert!(!corrupt.is_transient());
        assert!(!WorldError::NoActiveWorld.is_transient());
    }

    #[test]
    fn test_active_world_deletion_message() {
        let error = WorldError::ActiveWorldDeletion(WorldId(4));
        assert_eq!(error.to_string(), "Cannot delete the active world world-4");
    }
}
