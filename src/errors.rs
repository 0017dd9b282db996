use thiserror::Error;
use uuid::Uuid;

/// Errors that can arise while moving player documents to or from the backing store.
///
/// Every variant is fatal to the single operation that produced it, never to
/// the in-memory record.
#[derive(Debug, Error)]
pub enum PlayerStoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing store could not be reached or did not complete the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Returned when refreshing a record whose document no longer exists.
    #[error("no stored document for player {0}")]
    NotFound(Uuid),
}

impl PlayerStoreError {
    /// True for failures talking to the store, as opposed to bad data.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            PlayerStoreError::Sled(_) | PlayerStoreError::Io(_) | PlayerStoreError::Unavailable(_)
        )
    }
}
