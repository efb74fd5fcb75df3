//! Sync and validate command orchestrator
//!
//! Builds the directory source, catalog client and mapping store from the
//! configuration, runs a pass through the core engine and renders the result.

use crate::clients::{catalog_from_config, directory_from_config};
use crate::config::AppConfig;
use crate::output::{ReportFormat, create_formatter, write_report_file};
use crate::terminal::supports_color;
use anyhow::{Context, Result};
use colored::*;
use log::{debug, info};
use orgsync_core::{
    CancellationToken, CatalogClient, DirectorySource, HierarchyTree, MappingStore, SyncOptions,
    SyncReport,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Options of the `sync` command
#[derive(Debug, Clone)]
pub struct SyncCommandOptions {
    pub dry_run: bool,
    /// None uses the configured default format
    pub format: Option<ReportFormat>,
    /// Overrides `sync.pass_timeout_seconds`; zero disables the timeout
    pub timeout_seconds: Option<u64>,
}

/// What a sync command produced
#[derive(Debug)]
pub struct SyncRun {
    pub report: SyncReport,
    pub rendered: String,
    pub report_file: Option<PathBuf>,
}

impl SyncRun {
    /// The pass left work undone
    pub fn is_incomplete(&self) -> bool {
        self.report.has_failures() || self.report.cancelled
    }
}

/// Orchestrator for the sync and validate commands
pub struct SyncOrchestrator {
    config: AppConfig,
    engine: orgsync_core::SyncOrchestrator,
}

impl SyncOrchestrator {
    /// Create an orchestrator talking to the configured endpoints
    pub fn new(config: AppConfig) -> Result<Self> {
        let directory = directory_from_config(&config)?;
        let catalog = catalog_from_config(&config)?;
        Self::with_collaborators(config, directory, catalog)
    }

    /// Create an orchestrator around existing collaborators
    pub fn with_collaborators(
        config: AppConfig,
        directory: Arc<dyn DirectorySource>,
        catalog: Arc<dyn CatalogClient>,
    ) -> Result<Self> {
        let engine = orgsync_core::SyncOrchestrator::new(
            directory,
            catalog,
            config.compare_strategy(),
            config.updater_config(),
        )
        .context("Invalid sync settings")?;
        Ok(Self { config, engine })
    }

    fn pass_options(&self, options: &SyncCommandOptions) -> SyncOptions {
        let pass_timeout = match options.timeout_seconds {
            Some(0) => None,
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => self.config.pass_timeout(),
        };
        SyncOptions {
            dry_run: options.dry_run,
            allow_empty_source: self.config.sync.allow_empty_source,
            pass_timeout,
        }
    }

    /// Run one pass and render its report
    pub async fn sync(
        &self,
        options: &SyncCommandOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncRun> {
        let store_config = self.config.store_config();
        debug!("Using mapping file {}", store_config.file_path().display());
        let mut store = MappingStore::open(store_config).context("Failed to open mapping store")?;

        let pass_options = self.pass_options(options);
        info!(
            "Starting sync pass (dry run: {}, timeout: {:?})",
            pass_options.dry_run, pass_options.pass_timeout
        );
        let report = self
            .engine
            .run_pass(&mut store, &pass_options, cancel)
            .await
            .context("Sync pass failed")?;

        let format = options.format.unwrap_or(self.config.output.default_format);
        let use_color = supports_color(self.config.output.color_enabled);
        let rendered = create_formatter(format, use_color).format_report(&report)?;

        let report_file = if self.should_write_report(&report) {
            Some(write_report_file(&self.config.output.report_dir, &report)?)
        } else {
            None
        };

        Ok(SyncRun {
            report,
            rendered,
            report_file,
        })
    }

    fn should_write_report(&self, report: &SyncReport) -> bool {
        self.config.output.report_enabled && !report.dry_run && report.total_changes() > 0
    }

    /// Fetch and validate the directory without touching the catalog
    pub async fn validate(&self) -> Result<HierarchyTree> {
        self.engine
            .fetch_tree(self.config.sync.allow_empty_source)
            .await
            .context("Directory validation failed")
    }
}

/// Per-level overview of a validated hierarchy
pub fn format_tree_summary(tree: &HierarchyTree, use_color: bool) -> String {
    let mut output = String::new();
    let heading = format!("Hierarchy is valid: {} units", tree.len());
    if use_color {
        output.push_str(&format!("{}\n", heading.green().bold()));
    } else {
        output.push_str(&format!("{heading}\n"));
    }

    for (level, nodes) in tree.levels().enumerate() {
        output.push_str(&format!("  level {level}: {} units\n", nodes.len()));
    }
    output.push_str(&format!("  depth: {}\n", tree.depth()));
    output
}
