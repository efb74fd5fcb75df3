//! Structural errors raised while reconstructing the hierarchy

use thiserror::Error;

/// The flat record set cannot be turned into a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// Two records share the same external id
    #[error("Duplicate external id '{external_id}' in directory records")]
    DuplicateExternalId { external_id: String },

    /// A record has no external id
    #[error("Record at position {position} has an empty external id")]
    EmptyExternalId { position: usize },

    /// A record has a blank title
    #[error("Unit '{external_id}' has an empty title")]
    EmptyTitle { external_id: String },

    /// A parent reference points at no record
    #[error("Unit '{external_id}' references unknown parent '{parent_external_id}'")]
    OrphanParent {
        external_id: String,
        parent_external_id: String,
    },

    /// Parent references form a loop
    #[error("Parent references form a cycle: {}", .members.join(" -> "))]
    Cycle { members: Vec<String> },

    /// The directory returned no records at all
    #[error("Directory returned no organizational units")]
    EmptySource,
}

impl StructuralError {
    pub fn duplicate_external_id(external_id: &str) -> Self {
        Self::DuplicateExternalId {
            external_id: external_id.to_string(),
        }
    }

    pub fn empty_title(external_id: &str) -> Self {
        Self::EmptyTitle {
            external_id: external_id.to_string(),
        }
    }

    pub fn orphan_parent(external_id: &str, parent_external_id: &str) -> Self {
        Self::OrphanParent {
            external_id: external_id.to_string(),
            parent_external_id: parent_external_id.to_string(),
        }
    }

    pub fn cycle(members: Vec<String>) -> Self {
        Self::Cycle { members }
    }

    /// External id the error is attached to, if any
    pub fn external_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateExternalId { external_id }
            | Self::EmptyTitle { external_id }
            | Self::OrphanParent { external_id, .. } => Some(external_id),
            Self::Cycle { members } => members.first().map(String::as_str),
            Self::EmptyExternalId { .. } | Self::EmptySource => None,
        }
    }
}
