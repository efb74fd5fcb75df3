use super::ReportFormatter;
use anyhow::Result;
use colored::*;
use orgsync_core::sync::{EntryOutcome, ReportEntry};
use orgsync_core::{ChangeKind, SyncReport};

/// Text formatter for human-readable output
pub struct HumanFormatter {
    use_color: bool,
}

impl HumanFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, text: &str, color: fn(&str) -> ColoredString) -> String {
        if self.use_color {
            color(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn kind_label(&self, kind: ChangeKind) -> String {
        let label = format!("{kind:<6}");
        match kind {
            ChangeKind::Create => self.colorize(&label, |s| s.green()),
            ChangeKind::UpdateFields => self.colorize(&label, |s| s.cyan()),
            ChangeKind::MoveParent => self.colorize(&label, |s| s.blue()),
            ChangeKind::Delete => self.colorize(&label, |s| s.red()),
        }
    }

    fn outcome_label(&self, outcome: EntryOutcome) -> String {
        match outcome {
            EntryOutcome::Applied => self.colorize("ok", |s| s.green()),
            EntryOutcome::Failed => self.colorize("FAILED", |s| s.red().bold()),
            EntryOutcome::Skipped => self.colorize("skipped", |s| s.yellow()),
            EntryOutcome::Planned => self.colorize("planned", |s| s.dimmed()),
        }
    }

    fn format_entry(&self, entry: &ReportEntry) -> String {
        let mut line = format!(
            "  {} {} [{}] L{} {}",
            self.kind_label(entry.kind),
            self.outcome_label(entry.outcome),
            entry.external_id,
            entry.level,
            entry.title
        );
        if let Some(detail) = &entry.detail {
            line.push_str(&format!(" ({detail})"));
        }
        line.push('\n');
        for field in &entry.fields {
            line.push_str(&format!(
                "      {}: {} -> {}\n",
                field.field,
                field.old.as_deref().unwrap_or("-"),
                field.new.as_deref().unwrap_or("-")
            ));
        }
        line
    }
}

impl ReportFormatter for HumanFormatter {
    fn format_report(&self, report: &SyncReport) -> Result<String> {
        let mut output = String::new();
        let title = if report.dry_run {
            "Sync plan (dry run)"
        } else {
            "Sync report"
        };
        output.push_str(&format!("{}\n", self.colorize(title, |s| s.bold())));

        if report.entries.is_empty() {
            output.push_str(&format!(
                "Catalog is up to date ({} units unchanged)\n",
                report.counts.unchanged
            ));
        } else {
            output.push('\n');
            for entry in &report.entries {
                output.push_str(&self.format_entry(entry));
            }
        }

        let counts = &report.counts;
        output.push('\n');
        if report.dry_run {
            output.push_str(&format!(
                "Planned: {} create, {} update, {} move, {} delete; {} unchanged\n",
                report.planned_count(ChangeKind::Create),
                report.planned_count(ChangeKind::UpdateFields),
                report.planned_count(ChangeKind::MoveParent),
                report.planned_count(ChangeKind::Delete),
                counts.unchanged
            ));
        } else {
            output.push_str(&format!(
                "Created: {}  Updated: {}  Moved: {}  Deleted: {}  Unchanged: {}\n",
                counts.created, counts.updated, counts.moved, counts.deleted, counts.unchanged
            ));
            if counts.failed > 0 || counts.skipped > 0 {
                let failed = format!("Failed: {}", counts.failed);
                output.push_str(&format!(
                    "{}  Skipped: {}\n",
                    self.colorize(&failed, |s| s.red()),
                    counts.skipped
                ));
            }
        }

        let mapping = &report.mapping;
        if mapping.adopted + mapping.refreshed + mapping.pruned > 0 {
            output.push_str(&format!(
                "Mapping: {} adopted, {} refreshed, {} pruned\n",
                mapping.adopted, mapping.refreshed, mapping.pruned
            ));
        }
        if report.cancelled {
            output.push_str(&format!(
                "{}\n",
                self.colorize("Pass was cancelled before all changes were submitted", |s| {
                    s.yellow()
                })
            ));
        }
        let elapsed = report.finished_at - report.started_at;
        output.push_str(&format!(
            "Time: {:.2}s\n",
            elapsed.num_milliseconds() as f64 / 1000.0
        ));

        Ok(output)
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_report(&self, report: &SyncReport) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }
}

/// One `key=value` line, for scripts
pub struct MinimalFormatter;

impl ReportFormatter for MinimalFormatter {
    fn format_report(&self, report: &SyncReport) -> Result<String> {
        let c = &report.counts;
        Ok(format!(
            "created={} updated={} moved={} deleted={} unchanged={} failed={} skipped={} planned={}",
            c.created, c.updated, c.moved, c.deleted, c.unchanged, c.failed, c.skipped, c.planned
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use orgsync_core::FieldChange;
    use orgsync_core::sync::{ChangeCounts, MappingSummary};

    fn report(entries: Vec<ReportEntry>, counts: ChangeCounts) -> SyncReport {
        SyncReport {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            dry_run: false,
            cancelled: false,
            counts,
            mapping: MappingSummary::default(),
            entries,
        }
    }

    fn entry(kind: ChangeKind, outcome: EntryOutcome) -> ReportEntry {
        ReportEntry {
            external_id: "42".to_string(),
            title: "Finance".to_string(),
            kind,
            level: 1,
            target_id: None,
            outcome,
            detail: None,
            fields: vec![FieldChange::new("title", Some("Finances"), Some("Finance"))],
        }
    }

    #[test]
    fn test_human_lists_changes_and_counts() {
        let counts = ChangeCounts {
            updated: 1,
            unchanged: 3,
            ..Default::default()
        };
        let text = HumanFormatter::new(false)
            .format_report(&report(
                vec![entry(ChangeKind::UpdateFields, EntryOutcome::Applied)],
                counts,
            ))
            .unwrap();

        assert!(text.contains("[42] L1 Finance"));
        assert!(text.contains("title: Finances -> Finance"));
        assert!(text.contains("Updated: 1"));
        assert!(!text.contains("Failed"));
    }

    #[test]
    fn test_human_reports_up_to_date() {
        let counts = ChangeCounts {
            unchanged: 7,
            ..Default::default()
        };
        let text = HumanFormatter::new(false)
            .format_report(&report(Vec::new(), counts))
            .unwrap();
        assert!(text.contains("up to date (7 units unchanged)"));
    }

    #[test]
    fn test_minimal_is_single_line() {
        let counts = ChangeCounts {
            created: 2,
            failed: 1,
            ..Default::default()
        };
        let text = MinimalFormatter
            .format_report(&report(Vec::new(), counts))
            .unwrap();
        assert!(!text.contains('\n'));
        assert!(text.starts_with("created=2 "));
        assert!(text.contains("failed=1"));
    }

    #[test]
    fn test_json_round_trips_counts() {
        let counts = ChangeCounts {
            deleted: 4,
            ..Default::default()
        };
        let text = JsonFormatter::new(false)
            .format_report(&report(Vec::new(), counts))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["counts"]["deleted"], 4);
    }
}
