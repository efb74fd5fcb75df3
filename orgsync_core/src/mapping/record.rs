use crate::hierarchy::PathEscaping;
use crate::model::{TargetUnit, UnitRef};
use serde::{Deserialize, Serialize};

/// Row shape stored by a [`super::MappingStore`].
///
/// The id column is named by configuration; the remaining columns belong to
/// the record type.
pub trait MappingRecord: Clone + Send + Sync + 'static {
    /// Columns following the id column, in file order
    const COLUMNS: &'static [&'static str];

    fn external_id(&self) -> &str;

    fn target_id(&self) -> &str;

    /// Values for [`Self::COLUMNS`], same order
    fn to_columns(&self) -> Vec<String>;

    fn from_columns(external_id: &str, columns: &[&str]) -> Result<Self, String>;
}

/// Persisted link from an external unit to its catalog counterpart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub external_id: String,
    pub target_id: String,
    pub target_address: String,
    pub parent_collection_path: String,
    /// Title at the time of the last successful sync
    pub title: String,
}

impl MappingEntry {
    /// Entry for a unit the catalog just confirmed
    pub fn confirmed(
        external_id: &str,
        unit: &UnitRef,
        title: &str,
        parent_path: &[String],
        escaping: PathEscaping,
    ) -> Self {
        Self {
            external_id: external_id.to_string(),
            target_id: unit.target_id.clone(),
            target_address: unit.address.clone(),
            parent_collection_path: escaping.join(parent_path),
            title: title.to_string(),
        }
    }

    /// Entry describing a unit as observed in the live listing
    pub fn observed(external_id: &str, unit: &TargetUnit, escaping: PathEscaping) -> Self {
        Self {
            external_id: external_id.to_string(),
            target_id: unit.target_id.clone(),
            target_address: unit.address.clone(),
            parent_collection_path: escaping.join(unit.parent_path()),
            title: unit.title.clone(),
        }
    }
}

impl MappingRecord for MappingEntry {
    const COLUMNS: &'static [&'static str] = &[
        "target_id",
        "target_address",
        "parent_collection_path",
        "title",
    ];

    fn external_id(&self) -> &str {
        &self.external_id
    }

    fn target_id(&self) -> &str {
        &self.target_id
    }

    fn to_columns(&self) -> Vec<String> {
        vec![
            self.target_id.clone(),
            self.target_address.clone(),
            self.parent_collection_path.clone(),
            self.title.clone(),
        ]
    }

    fn from_columns(external_id: &str, columns: &[&str]) -> Result<Self, String> {
        match columns {
            [target_id, target_address, parent_collection_path, title] => Ok(Self {
                external_id: external_id.to_string(),
                target_id: target_id.to_string(),
                target_address: target_address.to_string(),
                parent_collection_path: parent_collection_path.to_string(),
                title: title.to_string(),
            }),
            _ => Err(format!(
                "expected {} columns, got {}",
                Self::COLUMNS.len(),
                columns.len()
            )),
        }
    }
}
