//! Mock collaborators for testing

mod catalog;
mod directory;

pub use catalog::{CatalogCall, MockCatalog};
pub use directory::StaticDirectory;
