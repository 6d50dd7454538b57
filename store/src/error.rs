use thiserror::Error;

/// Failure surface of the record store.
///
/// The store is reached over the network in production deployments, so every
/// operation can fail independently of the caller's in-memory state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the write.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    /// A record expected to exist was not found.
    #[error("record not found: {0}")]
    NotFound(String),
}
