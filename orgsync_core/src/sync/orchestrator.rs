use super::report::{MappingSummary, SyncReport};
use crate::catalog::{CatalogClient, DirectorySource};
use crate::compare::{CompareStrategy, ComparisonOutcome, HierarchyComparer};
use crate::error::{Result, StructuralError};
use crate::hierarchy::{HierarchyTree, PathEscaping, build_tree};
use crate::mapping::{MappingEntry, MappingStore};
use crate::model::ChangeKind;
use crate::update::{HierarchyUpdater, MappingMutation, UpdateReport, UpdaterConfig};
use chrono::Utc;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-pass switches
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Compute and report the change set without touching catalog or mapping
    pub dry_run: bool,
    /// Accept an empty directory, which deletes every mapped unit
    pub allow_empty_source: bool,
    /// Stop submitting new batches once this much time has passed
    pub pass_timeout: Option<Duration>,
}

/// Desired tree and the change set against the catalog
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub tree: HierarchyTree,
    pub comparison: ComparisonOutcome,
}

/// Drives fetch, transform, compare, update and mapping persistence
pub struct SyncOrchestrator {
    directory: Arc<dyn DirectorySource>,
    catalog: Arc<dyn CatalogClient>,
    comparer: HierarchyComparer,
    updater: HierarchyUpdater,
    escaping: PathEscaping,
}

impl SyncOrchestrator {
    pub fn new(
        directory: Arc<dyn DirectorySource>,
        catalog: Arc<dyn CatalogClient>,
        strategy: CompareStrategy,
        config: UpdaterConfig,
    ) -> Result<Self> {
        config.validate()?;
        let escaping = config.escaping;
        Ok(Self {
            directory,
            comparer: HierarchyComparer::new(strategy).with_escaping(escaping),
            updater: HierarchyUpdater::new(Arc::clone(&catalog), config),
            catalog,
            escaping,
        })
    }

    /// Fetch the directory and build the validated tree
    pub async fn fetch_tree(&self, allow_empty_source: bool) -> Result<HierarchyTree> {
        let records = self.directory.fetch_units().await?;
        info!("Fetched {} units from directory", records.len());
        if records.is_empty() && !allow_empty_source {
            error!("Directory returned no units; refusing to treat that as a full deletion");
            return Err(StructuralError::EmptySource.into());
        }

        build_tree(&records).map_err(|err| {
            error!("Hierarchy rejected: {err}");
            err.into()
        })
    }

    /// Everything up to the change set, without side effects
    pub async fn plan(&self, store: &MappingStore, allow_empty_source: bool) -> Result<SyncPlan> {
        let tree = self.fetch_tree(allow_empty_source).await?;

        let live = self.catalog.list_units().await?;
        debug!("Catalog lists {} units", live.len());

        let mapping: Vec<MappingEntry> = store.entries().cloned().collect();
        let comparison = self.comparer.compare(&tree, &mapping, &live).map_err(|err| {
            error!("Mapping integrity check failed: {err}");
            err
        })?;

        Ok(SyncPlan { tree, comparison })
    }

    /// Run one pass. Per-unit failures end up in the report; only fatal
    /// errors and store failures are returned as `Err`.
    pub async fn run_pass(
        &self,
        store: &mut MappingStore,
        options: &SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let started_at = Utc::now();
        store.load()?;

        let SyncPlan { tree, comparison } = self.plan(store, options.allow_empty_source).await?;
        if options.dry_run {
            info!(
                "Dry run: {} changes planned, nothing written",
                comparison.changes.len()
            );
            return Ok(SyncReport::planned(started_at, &comparison));
        }

        let mapping_summary = MappingSummary::from_comparison(&comparison);
        let ComparisonOutcome {
            changes,
            refreshed,
            stale_entries,
            unchanged,
        } = comparison;

        for external_id in &stale_entries {
            store.remove(external_id);
        }
        for binding in &refreshed {
            let entry = MappingEntry::observed(&binding.external_id, &binding.unit, self.escaping);
            if let Err(err) = store.upsert(entry) {
                warn!("Could not record '{}': {err}", binding.external_id);
            }
        }

        let placed: HashSet<String> = changes
            .iter()
            .filter(|change| change.kind != ChangeKind::Delete)
            .map(|change| change.external_id.clone())
            .collect();

        let pass_cancel = cancel.child_token();
        let timer = options.pass_timeout.map(|timeout| {
            let token = pass_cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!("Pass timeout of {timeout:?} reached, no further batches will be submitted");
                token.cancel();
            })
        });

        let update = self.updater.apply(changes, &pass_cancel).await;
        if let Some(timer) = timer {
            timer.abort();
        }

        for mutation in &update.mutations {
            match mutation {
                MappingMutation::Upsert(entry) => {
                    if let Err(err) = store.upsert(entry.clone()) {
                        error!(
                            "Catalog confirmed '{}' but its mapping entry is invalid: {err}",
                            entry.external_id
                        );
                    }
                }
                MappingMutation::Remove(external_id) => {
                    store.remove(external_id);
                }
            }
        }
        self.settle_parent_paths(store, &tree, unplaced(placed, &update));
        store.save()?;

        let report = SyncReport::from_update(started_at, unchanged, mapping_summary, &update);
        info!(
            "Sync pass finished: {} created, {} updated, {} moved, {} deleted, {} failed, {} skipped",
            report.counts.created,
            report.counts.updated,
            report.counts.moved,
            report.counts.deleted,
            report.counts.failed,
            report.counts.skipped
        );
        Ok(report)
    }

    /// Rewrite stored parent paths top-down for units whose whole ancestor
    /// chain now sits where the tree puts it. Renaming or moving a unit
    /// changes the path of every descendant without touching them.
    fn settle_parent_paths(
        &self,
        store: &mut MappingStore,
        tree: &HierarchyTree,
        unplaced: HashSet<String>,
    ) {
        let mut settled: HashSet<&str> = HashSet::with_capacity(tree.len());
        for node in tree.nodes() {
            if unplaced.contains(&node.external_id) {
                continue;
            }
            let parent_settled = node
                .parent_external_id
                .as_deref()
                .is_none_or(|parent| settled.contains(parent));
            if !parent_settled {
                continue;
            }
            settled.insert(node.external_id.as_str());

            let Some(stored) = store.get(&node.external_id) else {
                continue;
            };
            let expected = self.escaping.join(node.parent_path());
            if stored.parent_collection_path == expected {
                continue;
            }
            debug!(
                "Parent path of '{}' is now '{expected}' (was '{}')",
                node.external_id, stored.parent_collection_path
            );
            let entry = MappingEntry {
                parent_collection_path: expected,
                ..stored.clone()
            };
            if let Err(err) = store.upsert(entry) {
                warn!("Could not record '{}': {err}", node.external_id);
            }
        }
    }
}

/// Units with a create, update or move this pass that was not applied
fn unplaced(mut pending: HashSet<String>, update: &UpdateReport) -> HashSet<String> {
    for outcome in update.outcomes.iter().filter(|o| o.status.is_applied()) {
        pending.remove(&outcome.change.external_id);
    }
    pending
}
