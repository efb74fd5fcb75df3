//! Test utilities for orgsync
//!
//! This crate provides an in-memory catalog, a swappable directory source,
//! and record builders for exercising the sync pipeline without a network.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::{HierarchyBuilder, ScratchStore, balanced_hierarchy, store_config};
pub use mocks::{CatalogCall, MockCatalog, StaticDirectory};
