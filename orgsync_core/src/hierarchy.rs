//! Hierarchy reconstruction
//!
//! Turns the directory's flat parent-pointer records into a leveled tree and
//! renders hierarchical paths the way the catalog addresses containers.

mod path;
mod transformer;

pub use path::PathEscaping;
pub use transformer::{HierarchyTree, build_tree, normalize_parent};
