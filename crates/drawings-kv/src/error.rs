use std::path::PathBuf;

/// Errors from key-value engine operations.
///
/// A lost optimistic race is not an error: it is reported as
/// [`CommitResult::Conflict`](crate::CommitResult::Conflict).
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// I/O error from the write-ahead log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A key was empty where at least one part is required.
    #[error("key must have at least one part")]
    EmptyKey,

    /// The engine's internal lock was poisoned by a panicking writer.
    #[error("engine lock poisoned")]
    LockPoisoned,

    /// The write-ahead log could not be replayed.
    #[error("corrupt log at {path}: {reason}")]
    CorruptLog { path: PathBuf, reason: String },
}

/// Result alias for engine operations.
pub type KvResult<T> = Result<T, KvError>;
