use super::batch::submit_with_retry;
use super::retry::RetryPolicy;
use crate::catalog::{CatalogClient, ItemResult, ParentLocation, UnitPayload, UnitUpdate};
use crate::error::{CatalogError, ValidationError};
use crate::hierarchy::PathEscaping;
use crate::mapping::MappingEntry;
use crate::model::{ChangeKind, OrgUnitChange, ParentRef, UnitRef};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Tuning for how changes are submitted
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Changes per catalog call
    pub batch_size: usize,
    /// Outstanding catalog calls within one level
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
    pub escaping: PathEscaping,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            max_concurrency: 4,
            retry: RetryPolicy::default(),
            escaping: PathEscaping::default(),
        }
    }
}

impl UpdaterConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(ValidationError::invalid_parameter(
                "batch_size",
                "must be positive",
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ValidationError::invalid_parameter(
                "max_concurrency",
                "must be positive",
            ));
        }
        self.retry.validate()
    }
}

/// Why a change was not applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Catalog(CatalogError),
    /// The parent this unit must be placed under was not created
    ParentUnavailable { parent_external_id: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog(err) => write!(f, "{err}"),
            Self::ParentUnavailable { parent_external_id } => {
                write!(f, "parent '{parent_external_id}' is not available")
            }
        }
    }
}

/// Why a change was never submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Cancelled,
    /// A child that stays in the catalog keeps this container alive
    ChildRetained { child_external_id: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "pass cancelled before submission"),
            Self::ChildRetained { child_external_id } => {
                write!(f, "child '{child_external_id}' is still attached")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Applied,
    Failed(FailureReason),
    Skipped(SkipReason),
}

impl OutcomeStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Result of one change
#[derive(Debug, Clone)]
pub struct ChangeOutcome {
    pub change: OrgUnitChange,
    pub status: OutcomeStatus,
    /// Catalog reference confirmed by a successful create, update or move
    pub unit: Option<UnitRef>,
}

/// Mapping maintenance implied by a successful change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingMutation {
    Upsert(MappingEntry),
    Remove(String),
}

/// Everything an update run produced
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    /// One outcome per submitted change, in change-list order
    pub outcomes: Vec<ChangeOutcome>,
    pub mutations: Vec<MappingMutation>,
    pub cancelled: bool,
}

impl UpdateReport {
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_applied()).count()
    }
}

/// Change tagged with its position in the change list
struct Pending {
    seq: usize,
    change: OrgUnitChange,
    parent: Option<ParentLocation>,
}

type Tagged = (usize, ChangeOutcome);

/// Applies a change set to the catalog in dependency-safe order
pub struct HierarchyUpdater {
    client: Arc<dyn CatalogClient>,
    config: UpdaterConfig,
}

impl HierarchyUpdater {
    pub fn new(client: Arc<dyn CatalogClient>, config: UpdaterConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Apply `changes`; creations, updates and moves first, then deletions.
    pub async fn apply(
        &self,
        changes: Vec<OrgUnitChange>,
        cancel: &CancellationToken,
    ) -> UpdateReport {
        let mut writes: BTreeMap<usize, Vec<(usize, OrgUnitChange)>> = BTreeMap::new();
        let mut deletes: BTreeMap<usize, Vec<(usize, OrgUnitChange)>> = BTreeMap::new();
        for (seq, change) in changes.into_iter().enumerate() {
            let bucket = if change.kind == ChangeKind::Delete {
                &mut deletes
            } else {
                &mut writes
            };
            bucket.entry(change.level).or_default().push((seq, change));
        }

        let mut outcomes: Vec<Tagged> = Vec::new();
        // Containers that must survive, keyed by target id, with the child holding them
        let mut pinned: HashMap<String, String> = HashMap::new();

        self.apply_writes(writes, cancel, &mut outcomes, &mut pinned)
            .await;
        self.apply_deletes(deletes, cancel, &mut outcomes, &mut pinned)
            .await;

        outcomes.sort_by_key(|(seq, _)| *seq);
        let outcomes: Vec<ChangeOutcome> = outcomes.into_iter().map(|(_, o)| o).collect();
        let mutations = outcomes
            .iter()
            .filter_map(|outcome| self.mutation_for(outcome))
            .collect();

        let report = UpdateReport {
            outcomes,
            mutations,
            cancelled: cancel.is_cancelled(),
        };
        info!(
            "Applied {} of {} changes{}",
            report.applied(),
            report.outcomes.len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        report
    }

    async fn apply_writes(
        &self,
        levels: BTreeMap<usize, Vec<(usize, OrgUnitChange)>>,
        cancel: &CancellationToken,
        outcomes: &mut Vec<Tagged>,
        pinned: &mut HashMap<String, String>,
    ) {
        let mut created: HashMap<String, UnitRef> = HashMap::new();
        let mut unavailable: HashSet<String> = HashSet::new();

        for (level, changes) in levels {
            let mut ready = Vec::with_capacity(changes.len());
            for (seq, change) in changes {
                match self.resolve_parent(&change, &created, &unavailable) {
                    Ok(parent) => ready.push(Pending {
                        seq,
                        change,
                        parent,
                    }),
                    Err(_) if cancel.is_cancelled() => {
                        let status = OutcomeStatus::Skipped(SkipReason::Cancelled);
                        outcomes.push((seq, finished(change, status, None)));
                    }
                    Err(parent_external_id) => {
                        warn!(
                            "Not submitting {} of '{}': parent '{}' is unavailable",
                            change.kind, change.external_id, parent_external_id
                        );
                        let status =
                            OutcomeStatus::Failed(FailureReason::ParentUnavailable { parent_external_id });
                        outcomes.push((seq, finished(change, status, None)));
                    }
                }
            }

            debug!("Level {level}: submitting {} changes", ready.len());
            outcomes.extend(self.run_level(ready, cancel).await);

            for (_, outcome) in outcomes.iter() {
                if outcome.change.level != level || outcome.status.is_applied() {
                    continue;
                }
                match outcome.change.kind {
                    ChangeKind::Create => {
                        unavailable.insert(outcome.change.external_id.clone());
                    }
                    ChangeKind::MoveParent => {
                        if let Some(old_parent) = outcome
                            .change
                            .before
                            .as_ref()
                            .and_then(|before| before.parent_target_id.clone())
                        {
                            pinned
                                .entry(old_parent)
                                .or_insert_with(|| outcome.change.external_id.clone());
                        }
                    }
                    _ => {}
                }
            }
            for (_, outcome) in outcomes.iter() {
                if outcome.change.level == level
                    && outcome.change.kind == ChangeKind::Create
                    && let Some(unit) = &outcome.unit
                {
                    created.insert(outcome.change.external_id.clone(), unit.clone());
                }
            }
        }
    }

    async fn apply_deletes(
        &self,
        levels: BTreeMap<usize, Vec<(usize, OrgUnitChange)>>,
        cancel: &CancellationToken,
        outcomes: &mut Vec<Tagged>,
        pinned: &mut HashMap<String, String>,
    ) {
        for (level, changes) in levels.into_iter().rev() {
            let mut ready = Vec::with_capacity(changes.len());
            let mut held = Vec::new();

            for (seq, change) in changes {
                let target = change.target_id.clone().unwrap_or_default();
                match pinned.get(&target) {
                    Some(child) => {
                        info!(
                            "Keeping '{}': child '{}' is still attached",
                            change.external_id, child
                        );
                        let status = OutcomeStatus::Skipped(SkipReason::ChildRetained {
                            child_external_id: child.clone(),
                        });
                        held.push((seq, finished(change, status, None)));
                    }
                    None => ready.push(Pending {
                        seq,
                        change,
                        parent: None,
                    }),
                }
            }

            debug!("Level {level}: submitting {} deletions", ready.len());
            held.extend(self.run_level(ready, cancel).await);

            for (_, outcome) in &held {
                if !outcome.status.is_applied()
                    && let Some(parent) = outcome.change.before.as_ref().and_then(|b| b.parent_target_id.clone())
                {
                    pinned
                        .entry(parent)
                        .or_insert_with(|| outcome.change.external_id.clone());
                }
            }
            outcomes.extend(held);
        }
    }

    /// Where a create or move lands; `Err` names a parent that was not created
    fn resolve_parent(
        &self,
        change: &OrgUnitChange,
        created: &HashMap<String, UnitRef>,
        unavailable: &HashSet<String>,
    ) -> Result<Option<ParentLocation>, String> {
        let parent_path = change
            .after
            .as_ref()
            .map(|after| self.config.escaping.join(after.parent_path()))
            .unwrap_or_default();

        match &change.parent {
            ParentRef::Root => Ok(None),
            ParentRef::Existing { target_id, .. } => Ok(Some(ParentLocation {
                target_id: target_id.clone(),
                path: parent_path,
            })),
            ParentRef::Pending { external_id } => match created.get(external_id) {
                Some(unit) if !unavailable.contains(external_id) => Ok(Some(ParentLocation {
                    target_id: unit.target_id.clone(),
                    path: parent_path,
                })),
                _ => Err(external_id.clone()),
            },
        }
    }

    /// Run every batch of one level concurrently and wait for all of them
    async fn run_level(&self, ready: Vec<Pending>, cancel: &CancellationToken) -> Vec<Tagged> {
        let mut by_kind: BTreeMap<ChangeKind, Vec<Pending>> = BTreeMap::new();
        for pending in ready {
            by_kind.entry(pending.change.kind).or_default().push(pending);
        }

        let mut batches: Vec<(ChangeKind, Vec<Pending>)> = Vec::new();
        for (kind, mut items) in by_kind {
            while !items.is_empty() {
                let rest = items.split_off(items.len().min(self.config.batch_size));
                batches.push((kind, items));
                items = rest;
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut futures = FuturesUnordered::new();
        for (kind, batch) in batches {
            let semaphore = semaphore.clone();
            futures.push(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return skip_all(batch),
                };
                if cancel.is_cancelled() {
                    return skip_all(batch);
                }
                self.submit_batch(kind, batch, cancel).await
            });
        }

        let mut outcomes = Vec::new();
        while let Some(batch_outcomes) = futures.next().await {
            outcomes.extend(batch_outcomes);
        }
        outcomes
    }

    async fn submit_batch(
        &self,
        kind: ChangeKind,
        batch: Vec<Pending>,
        cancel: &CancellationToken,
    ) -> Vec<Tagged> {
        let policy = &self.config.retry;
        let results: Vec<ItemResult<Option<UnitRef>>> = match kind {
            ChangeKind::Create => {
                let payloads: Vec<UnitPayload> = batch.iter().map(payload_for).collect();
                submit_with_retry(policy, cancel, "create_units", payloads, |items| {
                    let client = Arc::clone(&self.client);
                    async move { client.create_units(&items).await }
                })
                .await
                .into_iter()
                .map(|result| result.map(Some))
                .collect()
            }
            ChangeKind::UpdateFields | ChangeKind::MoveParent => {
                let updates: Vec<UnitUpdate> = batch
                    .iter()
                    .map(|pending| UnitUpdate {
                        target_id: pending.change.target_id.clone().unwrap_or_default(),
                        payload: payload_for(pending),
                    })
                    .collect();
                submit_with_retry(policy, cancel, "update_units", updates, |items| {
                    let client = Arc::clone(&self.client);
                    async move { client.update_units(&items).await }
                })
                .await
                .into_iter()
                .map(|result| result.map(Some))
                .collect()
            }
            ChangeKind::Delete => {
                let target_ids: Vec<String> = batch
                    .iter()
                    .map(|pending| pending.change.target_id.clone().unwrap_or_default())
                    .collect();
                submit_with_retry(policy, cancel, "delete_units", target_ids, |items| {
                    let client = Arc::clone(&self.client);
                    async move { client.delete_units(&items).await }
                })
                .await
                .into_iter()
                .map(|result| match result {
                    // Already gone from the catalog
                    Ok(()) | Err(CatalogError::NotFound { .. }) => Ok(None),
                    Err(err) => Err(err),
                })
                .collect()
            }
        };

        batch
            .into_iter()
            .zip(results)
            .map(|(pending, result)| {
                let outcome = match result {
                    Ok(unit) => finished(pending.change, OutcomeStatus::Applied, unit),
                    Err(err) => {
                        warn!(
                            "{} of '{}' failed: {err}",
                            pending.change.kind, pending.change.external_id
                        );
                        finished(
                            pending.change,
                            OutcomeStatus::Failed(FailureReason::Catalog(err)),
                            None,
                        )
                    }
                };
                (pending.seq, outcome)
            })
            .collect()
    }

    fn mutation_for(&self, outcome: &ChangeOutcome) -> Option<MappingMutation> {
        if !outcome.status.is_applied() {
            return None;
        }
        let change = &outcome.change;
        match change.kind {
            ChangeKind::Delete => Some(MappingMutation::Remove(change.external_id.clone())),
            _ => {
                let after = change.after.as_ref()?;
                let unit = outcome.unit.as_ref()?;
                Some(MappingMutation::Upsert(MappingEntry::confirmed(
                    &change.external_id,
                    unit,
                    &after.title,
                    after.parent_path(),
                    self.config.escaping,
                )))
            }
        }
    }
}

fn payload_for(pending: &Pending) -> UnitPayload {
    let after = pending.change.after.as_ref();
    UnitPayload {
        external_id: pending.change.external_id.clone(),
        title: after.map(|a| a.title.clone()).unwrap_or_default(),
        parent: pending.parent.clone(),
        metadata: after.map(|a| a.metadata.clone()).unwrap_or_default(),
    }
}

fn finished(change: OrgUnitChange, status: OutcomeStatus, unit: Option<UnitRef>) -> ChangeOutcome {
    ChangeOutcome {
        change,
        status,
        unit,
    }
}

fn skip_all(batch: Vec<Pending>) -> Vec<Tagged> {
    batch
        .into_iter()
        .map(|pending| {
            let status = OutcomeStatus::Skipped(SkipReason::Cancelled);
            (pending.seq, finished(pending.change, status, None))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(UpdaterConfig::default().validate().is_ok());

        let config = UpdaterConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = UpdaterConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reason_display() {
        let reason = FailureReason::ParentUnavailable {
            parent_external_id: "A".into(),
        };
        assert_eq!(reason.to_string(), "parent 'A' is not available");
        assert_eq!(
            SkipReason::ChildRetained {
                child_external_id: "B".into()
            }
            .to_string(),
            "child 'B' is still attached"
        );
    }
}
