//! Applying a change set to the catalog
//!
//! Creations, updates and moves run level by level from the roots down,
//! deletions afterwards from the leaves up. Each level is a barrier; batches
//! inside a level run concurrently.

mod batch;
mod retry;
mod updater;

pub use batch::submit_with_retry;
pub use retry::RetryPolicy;
pub use updater::{
    ChangeOutcome, FailureReason, HierarchyUpdater, MappingMutation, OutcomeStatus, SkipReason,
    UpdateReport, UpdaterConfig,
};
