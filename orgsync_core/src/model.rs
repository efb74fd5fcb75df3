//! Data model shared by every stage of a sync pass

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form attributes carried alongside a unit (website link, etc.)
pub type Metadata = BTreeMap<String, String>;

/// Flat organizational unit as delivered by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgUnitRecord {
    pub external_id: String,
    pub title: String,
    pub parent_external_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl OrgUnitRecord {
    pub fn new(external_id: &str, title: &str, parent_external_id: Option<&str>) -> Self {
        Self {
            external_id: external_id.to_string(),
            title: title.to_string(),
            parent_external_id: parent_external_id.map(str::to_string),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Unit placed in the reconstructed hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgNode {
    pub external_id: String,
    pub title: String,
    pub parent_external_id: Option<String>,
    /// Depth in the tree, roots are level 0
    pub level: usize,
    /// Ancestor titles root-first, ending with this node's title
    pub path: Vec<String>,
    pub metadata: Metadata,
}

impl OrgNode {
    pub fn is_root(&self) -> bool {
        self.parent_external_id.is_none()
    }

    /// Path of the containing collection
    pub fn parent_path(&self) -> &[String] {
        &self.path[..self.path.len().saturating_sub(1)]
    }
}

/// Unit as currently stored in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetUnit {
    pub target_id: String,
    pub address: String,
    /// Titles from the managed root down to this unit
    pub path: Vec<String>,
    pub title: String,
    pub parent_target_id: Option<String>,
    /// External id attribute stored on the unit itself, if any
    pub external_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TargetUnit {
    pub fn level(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn parent_path(&self) -> &[String] {
        &self.path[..self.path.len().saturating_sub(1)]
    }
}

/// Identifier and address the catalog assigned to a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRef {
    pub target_id: String,
    pub address: String,
}

/// Kind of change the comparer can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Create,
    UpdateFields,
    MoveParent,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::UpdateFields => "update",
            Self::MoveParent => "move",
            Self::Delete => "delete",
        };
        f.pad(name)
    }
}

/// State of a unit on one side of a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSnapshot {
    pub title: String,
    pub parent_external_id: Option<String>,
    pub parent_target_id: Option<String>,
    pub path: Vec<String>,
    pub metadata: Metadata,
}

impl UnitSnapshot {
    pub fn parent_path(&self) -> &[String] {
        &self.path[..self.path.len().saturating_sub(1)]
    }
}

/// Single differing field with its old and new value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

impl FieldChange {
    pub fn new(field: &str, old: Option<&str>, new: Option<&str>) -> Self {
        Self {
            field: field.to_string(),
            old: old.map(str::to_string),
            new: new.map(str::to_string),
        }
    }
}

/// Where a created or moved unit must be placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParentRef {
    /// Directly under the managed root
    Root,
    /// Under a unit that already exists in the catalog
    Existing {
        external_id: String,
        target_id: String,
    },
    /// Under a unit created earlier in the same pass
    Pending { external_id: String },
}

impl ParentRef {
    pub fn external_id(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Existing { external_id, .. } | Self::Pending { external_id } => Some(external_id),
        }
    }
}

/// One required modification of the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgUnitChange {
    pub external_id: String,
    pub kind: ChangeKind,
    /// Level used for ordering; the live level for deletions
    pub level: usize,
    /// Existing catalog unit, absent for creations
    pub target_id: Option<String>,
    pub before: Option<UnitSnapshot>,
    pub after: Option<UnitSnapshot>,
    pub fields: Vec<FieldChange>,
    pub parent: ParentRef,
}

impl OrgUnitChange {
    /// Title shown in reports
    pub fn title(&self) -> &str {
        self.after
            .as_ref()
            .or(self.before.as_ref())
            .map(|snapshot| snapshot.title.as_str())
            .unwrap_or_default()
    }
}
