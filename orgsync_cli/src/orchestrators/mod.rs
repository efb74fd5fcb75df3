//! Command orchestrators
//!
//! Orchestrators wire the configured collaborators into the core engine and
//! turn its results into terminal output.

pub mod mapping_orchestrator;
pub mod sync_orchestrator;

pub use mapping_orchestrator::{MappingCheck, MappingOrchestrator, format_check, format_entries};
pub use sync_orchestrator::{SyncCommandOptions, SyncOrchestrator, SyncRun, format_tree_summary};
