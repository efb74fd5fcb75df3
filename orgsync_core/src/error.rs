//! Error types for the orgsync core library
//!
//! Errors are split by how a sync pass reacts to them. Structural and mapping
//! integrity errors abort a pass before anything is written to the catalog.
//! Catalog errors are either retried (transient) or reported against a single
//! unit. Store, source and validation errors surface from the collaborators
//! around the engine.

use thiserror::Error;

pub mod catalog;
pub mod integrity;
pub mod source;
pub mod store;
pub mod structural;
pub mod validation;

pub use self::catalog::CatalogError;
pub use self::integrity::MappingIntegrityError;
pub use self::source::SourceError;
pub use self::store::StoreError;
pub use self::structural::StructuralError;
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the orgsync core library
#[derive(Error, Debug)]
pub enum Error {
    /// The directory records do not form a valid hierarchy
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// The identity mapping disagrees with the live catalog
    #[error(transparent)]
    Integrity(#[from] MappingIntegrityError),

    /// Catalog operation failed as a whole
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Directory source could not be read
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Mapping file could not be read, written or locked
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid configuration or parameter
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Errors that must stop a pass before any catalog write.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Structural(_) | Self::Integrity(_))
    }

    /// Errors worth retrying as-is.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Catalog(err) => err.is_transient(),
            Self::Source(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Store(StoreError::from_std(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use std::io;

    #[test]
    fn test_structural_errors_are_fatal() {
        let error = Error::from(StructuralError::duplicate_external_id("A"));
        assert!(error.is_fatal());
        assert!(!error.is_transient());
        assert!(error.to_string().contains("A"));
    }

    #[test]
    fn test_integrity_errors_are_fatal() {
        let error = Error::from(MappingIntegrityError::duplicate_mapped_target(
            "3f1c", "A", "B",
        ));
        assert!(error.is_fatal());
    }

    #[test]
    fn test_catalog_transient_classification() {
        let transient = Error::from(CatalogError::transient("503 Service Unavailable"));
        assert!(transient.is_transient());
        assert!(!transient.is_fatal());

        let rejected = Error::from(CatalogError::rejected(Some(400), "bad title"));
        assert!(!rejected.is_transient());
        assert!(!rejected.is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "Access denied");
        let error: Error = io_error.into();

        assert!(matches!(error, Error::Store(StoreError::Io { .. })));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<()> {
            Err(StructuralError::EmptySource.into())
        }

        assert!(returns_error().is_err());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_error_display_formatting() {
        let errors: Vec<Error> = vec![
            StructuralError::orphan_parent("B", "Z").into(),
            StructuralError::cycle(vec!["A".into(), "B".into()]).into(),
            MappingIntegrityError::path_collision("Dept/Office", "B", Some("C")).into(),
            CatalogError::timeout("create_units").into(),
            SourceError::unavailable("connection refused").into(),
            StoreError::locked(std::path::Path::new("/tmp/map.csv.lock")).into(),
            ValidationError::invalid_parameter("batch_size", "must be positive").into(),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }
}
