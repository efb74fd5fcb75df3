use crate::model::{FieldChange, Metadata};
use serde::{Deserialize, Serialize};

/// Metadata key holding the unit's page in the directory
pub const LINK_FIELD: &str = "link";

/// Which unit attributes take part in comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareStrategy {
    /// Metadata keys compared and written in addition to the title
    pub tracked_fields: Vec<String>,
}

impl Default for CompareStrategy {
    fn default() -> Self {
        Self {
            tracked_fields: vec![LINK_FIELD.to_string()],
        }
    }
}

impl CompareStrategy {
    pub fn new<I, S>(tracked_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracked_fields: tracked_fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Compare titles only
    pub fn titles_only() -> Self {
        Self {
            tracked_fields: Vec::new(),
        }
    }

    pub fn titles_equal(&self, left: &str, right: &str) -> bool {
        left.trim() == right.trim()
    }

    /// Tracked value with blanks treated as absent
    pub fn tracked_value<'a>(&self, metadata: &'a Metadata, field: &str) -> Option<&'a str> {
        metadata
            .get(field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// Subset of metadata the catalog should receive
    pub fn tracked_metadata(&self, metadata: &Metadata) -> Metadata {
        self.tracked_fields
            .iter()
            .filter_map(|field| {
                self.tracked_value(metadata, field)
                    .map(|value| (field.clone(), value.to_string()))
            })
            .collect()
    }

    /// Tracked fields whose values differ between the two sides
    pub fn field_changes(&self, current: &Metadata, desired: &Metadata) -> Vec<FieldChange> {
        self.tracked_fields
            .iter()
            .filter_map(|field| {
                let old = self.tracked_value(current, field);
                let new = self.tracked_value(desired, field);
                (old != new).then(|| FieldChange::new(field, old, new))
            })
            .collect()
    }
}
