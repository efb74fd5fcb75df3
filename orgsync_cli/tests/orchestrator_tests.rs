//! Command orchestrators wired to in-memory collaborators

use orgsync_cli::config::AppConfig;
use orgsync_cli::orchestrators::{MappingOrchestrator, SyncCommandOptions, SyncOrchestrator};
use orgsync_cli::output::ReportFormat;
use orgsync_core::error::StructuralError;
use orgsync_core::{CancellationToken, OrgUnitRecord};
use orgsync_test_utils::{HierarchyBuilder, MockCatalog, StaticDirectory};
use std::sync::Arc;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.mapping.directory = dir.path().join("mappings");
    config.output.report_dir = dir.path().join("reports");
    config.sync.retry_initial_delay_ms = 1;
    config.sync.retry_max_delay_ms = 5;
    config
}

fn options(dry_run: bool) -> SyncCommandOptions {
    SyncCommandOptions {
        dry_run,
        format: Some(ReportFormat::Minimal),
        timeout_seconds: None,
    }
}

fn records() -> Vec<OrgUnitRecord> {
    HierarchyBuilder::new()
        .root("1", "Council")
        .child("2", "Finance", "1")
        .with_metadata("link", "https://dir/2")
        .child("3", "Legal", "1")
        .build()
}

fn orchestrator(
    dir: &TempDir,
    directory: &StaticDirectory,
    catalog: &MockCatalog,
) -> SyncOrchestrator {
    SyncOrchestrator::with_collaborators(
        test_config(dir),
        Arc::new(directory.clone()),
        Arc::new(catalog.clone()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_sync_writes_catalog_mapping_and_report() {
    let dir = TempDir::new().unwrap();
    let directory = StaticDirectory::new(records());
    let catalog = MockCatalog::new();

    let run = orchestrator(&dir, &directory, &catalog)
        .sync(&options(false), &CancellationToken::new())
        .await
        .unwrap();

    assert!(!run.is_incomplete());
    assert_eq!(run.report.counts.created, 3);
    assert!(run.rendered.starts_with("created=3 "));
    assert!(!run.rendered.contains('\n'));
    assert_eq!(catalog.unit_count(), 3);

    let report_file = run.report_file.expect("report file");
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(report_file).unwrap()).unwrap();
    assert_eq!(saved["counts"]["created"], 3);

    let mapping = MappingOrchestrator::with_catalog(test_config(&dir), Arc::new(catalog.clone()));
    let entries = mapping.show().unwrap();
    assert_eq!(entries.len(), 3);
    assert!(mapping.check().await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let directory = StaticDirectory::new(records());
    let catalog = MockCatalog::new();

    let run = orchestrator(&dir, &directory, &catalog)
        .sync(&options(true), &CancellationToken::new())
        .await
        .unwrap();

    assert!(run.report.dry_run);
    assert_eq!(run.report.counts.planned, 3);
    assert!(run.report_file.is_none());
    assert_eq!(catalog.unit_count(), 0);
    assert!(!dir.path().join("reports").exists());
}

#[tokio::test]
async fn test_unchanged_pass_writes_no_report() {
    let dir = TempDir::new().unwrap();
    let directory = StaticDirectory::new(records());
    let catalog = MockCatalog::new();
    let orchestrator = orchestrator(&dir, &directory, &catalog);

    orchestrator
        .sync(&options(false), &CancellationToken::new())
        .await
        .unwrap();
    let second = orchestrator
        .sync(&options(false), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(second.report.total_changes(), 0);
    assert_eq!(second.report.counts.unchanged, 3);
    assert!(second.report_file.is_none());
}

#[tokio::test]
async fn test_rejected_unit_marks_run_incomplete() {
    let dir = TempDir::new().unwrap();
    let directory = StaticDirectory::new(records());
    let catalog = MockCatalog::new();
    catalog.reject("3");

    let run = orchestrator(&dir, &directory, &catalog)
        .sync(&options(false), &CancellationToken::new())
        .await
        .unwrap();

    assert!(run.is_incomplete());
    assert_eq!(run.report.counts.failed, 1);
    assert_eq!(run.report.counts.created, 2);
}

#[tokio::test]
async fn test_empty_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let directory = StaticDirectory::new(Vec::new());
    let catalog = MockCatalog::new();

    let error = orchestrator(&dir, &directory, &catalog)
        .sync(&options(false), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        error.downcast_ref::<orgsync_core::Error>(),
        Some(orgsync_core::Error::Structural(StructuralError::EmptySource))
    ));
    assert_eq!(catalog.batch_count(), 0);
}

#[tokio::test]
async fn test_validate_does_not_touch_catalog() {
    let dir = TempDir::new().unwrap();
    let directory = StaticDirectory::new(records());
    let catalog = MockCatalog::new();

    let tree = orchestrator(&dir, &directory, &catalog)
        .validate()
        .await
        .unwrap();

    assert_eq!(tree.len(), 3);
    assert_eq!(tree.depth(), 2);
    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn test_mapping_check_finds_units_deleted_out_of_band() {
    let dir = TempDir::new().unwrap();
    let directory = StaticDirectory::new(records());
    let source_catalog = MockCatalog::new();
    orchestrator(&dir, &directory, &source_catalog)
        .sync(&options(false), &CancellationToken::new())
        .await
        .unwrap();

    // A fresh catalog holds none of the mapped units
    let empty_catalog = MockCatalog::new();
    let mapping = MappingOrchestrator::with_catalog(test_config(&dir), Arc::new(empty_catalog));
    let check = mapping.check().await.unwrap();

    assert_eq!(check.checked, 3);
    assert_eq!(check.missing.len(), 3);
    assert!(!check.is_consistent());
}
