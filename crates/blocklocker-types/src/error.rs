use thiserror::Error;

/// Errors produced while building or parsing a [`CoordinateKey`](crate::CoordinateKey).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid coordinate: {reason}")]
    InvalidCoordinate { reason: String },
}

impl KeyError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidCoordinate {
            reason: reason.into(),
        }
    }
}
