use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use orgsync_core::SyncReport;
use std::fs;
use std::path::{Path, PathBuf};

/// `org_sync_report_YYYYmmdd_HHMMSS.json` for the pass start time
pub fn report_file_name(started_at: &DateTime<Utc>) -> String {
    format!("org_sync_report_{}.json", started_at.format("%Y%m%d_%H%M%S"))
}

/// Write the report as pretty JSON into `dir`, creating it if needed
pub fn write_report_file(dir: &Path, report: &SyncReport) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {}", dir.display()))?;
    let path = dir.join(report_file_name(&report.started_at));
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    info!("Wrote sync report to {}", path.display());
    Ok(path)
}
