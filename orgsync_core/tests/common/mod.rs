//! Common test utilities for integration tests
//!
//! Wires the in-memory catalog and directory into an orchestrator with
//! retry delays short enough for tests.

use orgsync_core::{CompareStrategy, OrgUnitRecord, RetryPolicy, SyncOrchestrator, UpdaterConfig};
use orgsync_test_utils::{MockCatalog, StaticDirectory};
use std::sync::Arc;
use std::time::Duration;

/// Updater settings with millisecond backoff
pub fn fast_config() -> UpdaterConfig {
    UpdaterConfig {
        retry: RetryPolicy::new(4)
            .with_initial_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5)),
        ..UpdaterConfig::default()
    }
}

/// Handles kept by a test after the orchestrator takes its collaborators
pub struct Pipeline {
    pub directory: StaticDirectory,
    pub catalog: MockCatalog,
    pub orchestrator: SyncOrchestrator,
}

pub fn pipeline(records: Vec<OrgUnitRecord>) -> Pipeline {
    pipeline_with(records, MockCatalog::new(), fast_config())
}

pub fn pipeline_with(
    records: Vec<OrgUnitRecord>,
    catalog: MockCatalog,
    config: UpdaterConfig,
) -> Pipeline {
    let directory = StaticDirectory::new(records);
    let orchestrator = SyncOrchestrator::new(
        Arc::new(directory.clone()),
        Arc::new(catalog.clone()),
        CompareStrategy::default(),
        config,
    )
    .unwrap();
    Pipeline {
        directory,
        catalog,
        orchestrator,
    }
}
