use crate::compare::ComparisonOutcome;
use crate::model::{ChangeKind, FieldChange, OrgUnitChange};
use crate::update::{ChangeOutcome, OutcomeStatus, UpdateReport};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to a single change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOutcome {
    Applied,
    Failed,
    Skipped,
    /// Computed by a dry run, not submitted
    Planned,
}

/// Totals per change kind and outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeCounts {
    pub created: usize,
    pub updated: usize,
    pub moved: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
    pub planned: usize,
}

/// Mapping maintenance that needed no catalog write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingSummary {
    pub adopted: usize,
    pub refreshed: usize,
    pub pruned: usize,
}

impl MappingSummary {
    pub fn from_comparison(comparison: &ComparisonOutcome) -> Self {
        let adopted = comparison.refreshed.iter().filter(|b| b.adopted).count();
        Self {
            adopted,
            refreshed: comparison.refreshed.len() - adopted,
            pruned: comparison.stale_entries.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub external_id: String,
    pub title: String,
    pub kind: ChangeKind,
    pub level: usize,
    pub target_id: Option<String>,
    pub outcome: EntryOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub fields: Vec<FieldChange>,
}

impl ReportEntry {
    fn new(change: &OrgUnitChange, outcome: EntryOutcome, detail: Option<String>) -> Self {
        Self {
            external_id: change.external_id.clone(),
            title: change.title().to_string(),
            kind: change.kind,
            level: change.level,
            target_id: change.target_id.clone(),
            outcome,
            detail,
            fields: change.fields.clone(),
        }
    }

    fn from_outcome(outcome: &ChangeOutcome) -> Self {
        let (status, detail) = match &outcome.status {
            OutcomeStatus::Applied => (EntryOutcome::Applied, None),
            OutcomeStatus::Failed(reason) => (EntryOutcome::Failed, Some(reason.to_string())),
            OutcomeStatus::Skipped(reason) => (EntryOutcome::Skipped, Some(reason.to_string())),
        };
        let mut entry = Self::new(&outcome.change, status, detail);
        if let Some(unit) = &outcome.unit {
            entry.target_id = Some(unit.target_id.clone());
        }
        entry
    }
}

/// Result of one pass, serializable for the report file
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub cancelled: bool,
    pub counts: ChangeCounts,
    pub mapping: MappingSummary,
    pub entries: Vec<ReportEntry>,
}

impl SyncReport {
    /// Report for a dry run: every change is planned
    pub fn planned(started_at: DateTime<Utc>, comparison: &ComparisonOutcome) -> Self {
        let entries: Vec<ReportEntry> = comparison
            .changes
            .iter()
            .map(|change| ReportEntry::new(change, EntryOutcome::Planned, None))
            .collect();
        Self::finish(
            started_at,
            true,
            false,
            comparison.unchanged,
            MappingSummary::from_comparison(comparison),
            entries,
        )
    }

    pub fn from_update(
        started_at: DateTime<Utc>,
        unchanged: usize,
        mapping: MappingSummary,
        update: &UpdateReport,
    ) -> Self {
        let entries = update.outcomes.iter().map(ReportEntry::from_outcome).collect();
        Self::finish(started_at, false, update.cancelled, unchanged, mapping, entries)
    }

    fn finish(
        started_at: DateTime<Utc>,
        dry_run: bool,
        cancelled: bool,
        unchanged: usize,
        mapping: MappingSummary,
        entries: Vec<ReportEntry>,
    ) -> Self {
        let mut counts = ChangeCounts {
            unchanged,
            ..Default::default()
        };
        for entry in &entries {
            match entry.outcome {
                EntryOutcome::Applied => match entry.kind {
                    ChangeKind::Create => counts.created += 1,
                    ChangeKind::UpdateFields => counts.updated += 1,
                    ChangeKind::MoveParent => counts.moved += 1,
                    ChangeKind::Delete => counts.deleted += 1,
                },
                EntryOutcome::Failed => counts.failed += 1,
                EntryOutcome::Skipped => counts.skipped += 1,
                EntryOutcome::Planned => counts.planned += 1,
            }
        }

        Self {
            started_at,
            finished_at: Utc::now(),
            dry_run,
            cancelled,
            counts,
            mapping,
            entries,
        }
    }

    /// Number of changes the pass dealt with
    pub fn total_changes(&self) -> usize {
        self.entries.len()
    }

    pub fn has_failures(&self) -> bool {
        self.counts.failed > 0
    }

    pub fn entries_with(&self, outcome: EntryOutcome) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.outcome == outcome)
    }

    /// Planned count for a change kind in a dry run
    pub fn planned_count(&self, kind: ChangeKind) -> usize {
        self.entries_with(EntryOutcome::Planned)
            .filter(|e| e.kind == kind)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::model::{ParentRef, UnitRef, UnitSnapshot};
    use crate::update::{FailureReason, SkipReason};

    fn change(id: &str, kind: ChangeKind) -> OrgUnitChange {
        OrgUnitChange {
            external_id: id.into(),
            kind,
            level: 0,
            target_id: None,
            before: None,
            after: Some(UnitSnapshot {
                title: format!("Unit {id}"),
                parent_external_id: None,
                parent_target_id: None,
                path: vec![format!("Unit {id}")],
                metadata: Default::default(),
            }),
            fields: vec![FieldChange::new("title", None, Some(format!("Unit {id}").as_str()))],
            parent: ParentRef::Root,
        }
    }

    #[test]
    fn test_counts_by_kind_and_outcome() {
        let update = UpdateReport {
            outcomes: vec![
                ChangeOutcome {
                    change: change("A", ChangeKind::Create),
                    status: OutcomeStatus::Applied,
                    unit: Some(UnitRef {
                        target_id: "t-a".into(),
                        address: "/a".into(),
                    }),
                },
                ChangeOutcome {
                    change: change("B", ChangeKind::UpdateFields),
                    status: OutcomeStatus::Failed(FailureReason::Catalog(CatalogError::rejected(
                        Some(400),
                        "bad",
                    ))),
                    unit: None,
                },
                ChangeOutcome {
                    change: change("C", ChangeKind::Delete),
                    status: OutcomeStatus::Skipped(SkipReason::Cancelled),
                    unit: None,
                },
            ],
            mutations: Vec::new(),
            cancelled: true,
        };

        let report = SyncReport::from_update(Utc::now(), 7, MappingSummary::default(), &update);
        assert_eq!(report.counts.created, 1);
        assert_eq!(report.counts.failed, 1);
        assert_eq!(report.counts.skipped, 1);
        assert_eq!(report.counts.unchanged, 7);
        assert!(report.cancelled);
        assert!(report.has_failures());
        assert_eq!(report.entries[0].target_id.as_deref(), Some("t-a"));
        assert!(report.entries[1].detail.as_deref().unwrap().contains("bad"));
    }

    #[test]
    fn test_planned_report_serializes() {
        let comparison = ComparisonOutcome {
            changes: vec![change("A", ChangeKind::Create)],
            unchanged: 2,
            ..Default::default()
        };
        let report = SyncReport::planned(Utc::now(), &comparison);
        assert!(report.dry_run);
        assert_eq!(report.counts.planned, 1);
        assert_eq!(report.planned_count(ChangeKind::Create), 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["outcome"], "planned");
        assert_eq!(json["entries"][0]["kind"], "create");
        assert_eq!(json["counts"]["unchanged"], 2);
        assert!(json["entries"][0].get("detail").is_none());
    }
}
