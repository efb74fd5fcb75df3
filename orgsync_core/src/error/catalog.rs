//! Catalog operation errors

use thiserror::Error;

/// Failure of a catalog call, either for a whole batch or a single item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Temporary failure (throttling, 5xx, dropped connection)
    #[error("Catalog temporarily unavailable: {message}")]
    Transient { message: String },

    /// The call did not complete in time
    #[error("Catalog operation '{operation}' timed out")]
    Timeout { operation: String },

    /// The catalog refused the payload
    #[error("Catalog rejected the request{}: {message}", format_status(.status))]
    Rejected { status: Option<u16>, message: String },

    /// The addressed unit does not exist
    #[error("Catalog unit {target_id} not found")]
    NotFound { target_id: String },

    /// Anything the client could not classify
    #[error("Catalog error: {message}")]
    Other { message: String },
}

fn format_status(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}

impl CatalogError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn timeout(operation: &str) -> Self {
        Self::Timeout {
            operation: operation.to_string(),
        }
    }

    pub fn rejected(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(target_id: &str) -> Self {
        Self::NotFound {
            target_id: target_id.to_string(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Map an HTTP status to the matching category
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            408 => Self::Timeout {
                operation: message.into(),
            },
            429 | 500..=599 => Self::Transient {
                message: format!("HTTP {status}: {}", message.into()),
            },
            404 => Self::Other {
                message: format!("HTTP 404: {}", message.into()),
            },
            _ => Self::Rejected {
                status: Some(status),
                message: message.into(),
            },
        }
    }

    /// Check if this error is transient and can be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout { .. })
    }

    /// Check if the catalog refused the data itself
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}
