//! Mapping command orchestrator: inspect the identity mapping and compare
//! it with the live catalog

use crate::clients::catalog_from_config;
use crate::config::AppConfig;
use crate::output::ReportFormat;
use anyhow::{Context, Result};
use colored::*;
use log::debug;
use orgsync_core::{CatalogClient, MappingEntry, MappingStore, TargetUnit};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Mapping entry whose catalog unit no longer matches it
#[derive(Debug, Clone, Serialize)]
pub struct DriftedEntry {
    pub entry: MappingEntry,
    pub live_address: String,
    pub live_title: String,
    /// External id stored on the live unit, when it names a different unit
    pub foreign_external_id: Option<String>,
}

/// Result of `mapping check`
#[derive(Debug, Default, Serialize)]
pub struct MappingCheck {
    pub checked: usize,
    /// Entries whose target no longer exists
    pub missing: Vec<MappingEntry>,
    pub drifted: Vec<DriftedEntry>,
    /// Live units carrying an external id that has no entry
    pub unmapped: Vec<String>,
}

impl MappingCheck {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.drifted.is_empty()
    }
}

/// Orchestrator for the mapping commands
pub struct MappingOrchestrator {
    config: AppConfig,
    catalog: Arc<dyn CatalogClient>,
}

impl MappingOrchestrator {
    pub fn new(config: AppConfig) -> Result<Self> {
        let catalog = catalog_from_config(&config)?;
        Ok(Self::with_catalog(config, catalog))
    }

    pub fn with_catalog(config: AppConfig, catalog: Arc<dyn CatalogClient>) -> Self {
        Self { config, catalog }
    }

    fn load_entries(&self) -> Result<Vec<MappingEntry>> {
        let mut store = MappingStore::<MappingEntry>::open(self.config.store_config())
            .context("Failed to open mapping store")?;
        let count = store.load().context("Failed to read mapping file")?;
        debug!("Loaded {count} entries from {}", store.path().display());
        Ok(store.entries().cloned().collect())
    }

    /// Entries currently recorded, ordered by external id
    pub fn show(&self) -> Result<Vec<MappingEntry>> {
        self.load_entries()
    }

    /// Compare every entry with the live catalog listing
    pub async fn check(&self) -> Result<MappingCheck> {
        let entries = self.load_entries()?;
        let live = self
            .catalog
            .list_units()
            .await
            .context("Failed to list catalog units")?;
        Ok(check_entries(&entries, &live))
    }
}

fn check_entries(entries: &[MappingEntry], live: &[TargetUnit]) -> MappingCheck {
    let by_target: HashMap<&str, &TargetUnit> =
        live.iter().map(|unit| (unit.target_id.as_str(), unit)).collect();
    let mut check = MappingCheck {
        checked: entries.len(),
        ..Default::default()
    };

    for entry in entries {
        let Some(unit) = by_target.get(entry.target_id.as_str()) else {
            check.missing.push(entry.clone());
            continue;
        };
        let foreign_external_id = unit
            .external_id
            .as_ref()
            .filter(|id| **id != entry.external_id)
            .cloned();
        if unit.address != entry.target_address
            || unit.title != entry.title
            || foreign_external_id.is_some()
        {
            check.drifted.push(DriftedEntry {
                entry: entry.clone(),
                live_address: unit.address.clone(),
                live_title: unit.title.clone(),
                foreign_external_id,
            });
        }
    }

    let mapped: HashSet<&str> = entries.iter().map(|entry| entry.external_id.as_str()).collect();
    check.unmapped = live
        .iter()
        .filter_map(|unit| unit.external_id.as_deref())
        .filter(|id| !mapped.contains(id))
        .map(str::to_string)
        .collect();
    check.unmapped.sort();
    check
}

/// Render mapping entries in the requested format
pub fn format_entries(entries: &[MappingEntry], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        ReportFormat::Minimal => Ok(entries
            .iter()
            .map(|entry| format!("{}\t{}\n", entry.external_id, entry.target_id))
            .collect()),
        ReportFormat::Human => {
            if entries.is_empty() {
                return Ok("No mapping entries recorded\n".to_string());
            }
            let mut output = format!("{} mapping entries\n", entries.len());
            for entry in entries {
                output.push_str(&format!(
                    "  {} -> {} ({})\n",
                    entry.external_id, entry.target_id, entry.title
                ));
            }
            Ok(output)
        }
    }
}

/// Render a mapping check in the requested format
pub fn format_check(check: &MappingCheck, format: ReportFormat, use_color: bool) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(check)?),
        ReportFormat::Minimal => Ok(format!(
            "checked={} missing={} drifted={} unmapped={}\n",
            check.checked,
            check.missing.len(),
            check.drifted.len(),
            check.unmapped.len()
        )),
        ReportFormat::Human => {
            let mut output = String::new();
            let heading = if check.is_consistent() {
                format!("All {} mapping entries match the catalog", check.checked)
            } else {
                format!(
                    "{} of {} mapping entries need attention",
                    check.missing.len() + check.drifted.len(),
                    check.checked
                )
            };
            let heading = match (use_color, check.is_consistent()) {
                (false, _) => heading,
                (true, true) => heading.green().to_string(),
                (true, false) => heading.yellow().to_string(),
            };
            output.push_str(&format!("{heading}\n"));

            for entry in &check.missing {
                output.push_str(&format!(
                    "  missing  {} -> {} (unit no longer in catalog)\n",
                    entry.external_id, entry.target_id
                ));
            }
            for drift in &check.drifted {
                output.push_str(&format!(
                    "  drifted  {} -> {}: '{}' at {}\n",
                    drift.entry.external_id, drift.entry.target_id, drift.live_title, drift.live_address
                ));
                if let Some(foreign) = &drift.foreign_external_id {
                    output.push_str(&format!("           unit is tagged with external id {foreign}\n"));
                }
            }
            if !check.unmapped.is_empty() {
                output.push_str(&format!(
                    "  {} catalog units carry an external id without an entry; the next sync adopts them\n",
                    check.unmapped.len()
                ));
            }
            Ok(output)
        }
    }
}
