//! Builders for directory records and scratch mapping stores

mod records;
mod store;

pub use records::{HierarchyBuilder, balanced_hierarchy};
pub use store::{ScratchStore, store_config};
