//! One sync pass from directory fetch to persisted mapping

mod orchestrator;
mod report;

pub use orchestrator::{SyncOptions, SyncOrchestrator, SyncPlan};
pub use report::{ChangeCounts, EntryOutcome, MappingSummary, ReportEntry, SyncReport};
