//! Mapping store errors

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reading, writing or locking the mapping file failed.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying file system error
    #[error("{}", format_io(.path, .source))]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// Another pass holds the lock
    #[error("Mapping store is locked by another process: {}", .path.display())]
    Locked { path: PathBuf },

    /// CSV reader or writer failure
    #[error("Invalid mapping file {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A required column is missing from the header
    #[error("Mapping file {} is missing column '{column}'", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// A row carries a target id that is not a UUID
    #[error("Mapping entry '{external_id}' has invalid target id '{value}'")]
    InvalidTargetId { external_id: String, value: String },

    /// A row could not be interpreted
    #[error("Malformed mapping row {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
}

fn format_io(path: &Option<PathBuf>, source: &std::io::Error) -> String {
    match path {
        Some(path) => format!("I/O error on {}: {source}", path.display()),
        None => format!("I/O error: {source}"),
    }
}

impl StoreError {
    pub fn from_std(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: Some(path.to_path_buf()),
            source,
        }
    }

    pub fn locked(path: &Path) -> Self {
        Self::Locked {
            path: path.to_path_buf(),
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid_target_id(external_id: &str, value: &str) -> Self {
        Self::InvalidTargetId {
            external_id: external_id.to_string(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_error_includes_path() {
        let error = StoreError::io(
            Path::new("/data/mappings.csv"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(error.to_string().contains("/data/mappings.csv"));
    }

    #[test]
    fn test_locked_error() {
        let error = StoreError::locked(Path::new("/data/mappings.csv.lock"));
        assert!(error.to_string().contains("locked"));
    }
}
