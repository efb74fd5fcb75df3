//! Diffing the desired hierarchy against the catalog

mod comparer;
mod strategy;

pub use comparer::{ComparisonOutcome, HierarchyComparer, LiveBinding};
pub use strategy::{CompareStrategy, LINK_FIELD};
