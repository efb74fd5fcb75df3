//! orgsync core library
//!
//! Reconciles an organizational hierarchy published by an external directory
//! against the container hierarchy of a catalog system: flat records are
//! rebuilt into a leveled tree, diffed against the catalog through a durable
//! identity mapping, and applied level by level so parents always exist
//! before their children.

pub mod catalog;
pub mod compare;
pub mod error;
pub mod hierarchy;
pub mod mapping;
pub mod model;
pub mod sync;
pub mod update;

// Re-export main types
pub use catalog::{CatalogClient, DirectorySource, ParentLocation, UnitPayload, UnitUpdate};
pub use compare::{CompareStrategy, ComparisonOutcome, HierarchyComparer};
pub use error::{Error, Result};
pub use hierarchy::{HierarchyTree, PathEscaping, build_tree};
pub use mapping::{MappingEntry, MappingRecord, MappingStore, MappingStoreConfig};
pub use model::{
    ChangeKind, FieldChange, Metadata, OrgNode, OrgUnitChange, OrgUnitRecord, ParentRef,
    TargetUnit, UnitRef, UnitSnapshot,
};
pub use sync::{SyncOptions, SyncOrchestrator, SyncPlan, SyncReport};
pub use update::{HierarchyUpdater, RetryPolicy, UpdateReport, UpdaterConfig};

// Cancellation handle accepted by the updater and orchestrator
pub use tokio_util::sync::CancellationToken;
