/// Errors from lock store and persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store or persistence adapter cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A snapshot is malformed, truncated, or of an unknown version.
    #[error("invalid snapshot: {0}")]
    Snapshot(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from a file-backed adapter.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this error means the store could not be reached at all.
    /// I/O failures count.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
