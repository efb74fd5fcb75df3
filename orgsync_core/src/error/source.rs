//! Directory source errors

use thiserror::Error;

/// The external directory could not deliver its records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Service unreachable or answered with a server error
    #[error("Directory unavailable: {message}")]
    Unavailable { message: String },

    /// Response or file could not be parsed into records
    #[error("Malformed directory data: {message}")]
    Malformed { message: String },
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
