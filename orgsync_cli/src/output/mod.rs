//! Rendering of sync reports for the terminal and for report files

mod formatters;
mod report_file;

pub use formatters::{HumanFormatter, JsonFormatter, MinimalFormatter};
pub use report_file::{report_file_name, write_report_file};

use anyhow::Result;
use orgsync_core::SyncReport;
use serde::{Deserialize, Serialize};

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Human,
    Json,
    Minimal,
}

/// Trait for report formatters
pub trait ReportFormatter: Send + Sync {
    fn format_report(&self, report: &SyncReport) -> Result<String>;
}

/// Create a formatter based on output format
pub fn create_formatter(format: ReportFormat, use_color: bool) -> Box<dyn ReportFormatter> {
    match format {
        ReportFormat::Human => Box::new(HumanFormatter::new(use_color)),
        ReportFormat::Json => Box::new(JsonFormatter::new(true)),
        ReportFormat::Minimal => Box::new(MinimalFormatter),
    }
}
