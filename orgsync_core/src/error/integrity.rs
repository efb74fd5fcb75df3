//! Identity mapping integrity errors

use thiserror::Error;

/// The mapping and the live catalog cannot be reconciled automatically.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingIntegrityError {
    /// Two live units resolve to the same external id
    #[error(
        "External id '{external_id}' is bound to more than one catalog unit ({first_target_id}, {second_target_id})"
    )]
    DuplicateLiveExternalId {
        external_id: String,
        first_target_id: String,
        second_target_id: String,
    },

    /// Two mapping entries point at the same catalog unit
    #[error("Catalog unit {target_id} is mapped to both '{first}' and '{second}'")]
    DuplicateMappedTarget {
        target_id: String,
        first: String,
        second: String,
    },

    /// The mapping file lists the same external id twice
    #[error("Mapping file contains external id '{external_id}' more than once")]
    DuplicateMappingEntry { external_id: String },

    /// A unit to be created would land on a path held by another unit
    #[error("Cannot create '{external_id}' at '{path}': path is held by {}", describe_holder(.existing_external_id))]
    PathCollision {
        path: String,
        external_id: String,
        existing_external_id: Option<String>,
    },
}

fn describe_holder(holder: &Option<String>) -> String {
    match holder {
        Some(external_id) => format!("unit '{external_id}'"),
        None => "an unmapped unit".to_string(),
    }
}

impl MappingIntegrityError {
    pub fn duplicate_live_external_id(external_id: &str, first: &str, second: &str) -> Self {
        Self::DuplicateLiveExternalId {
            external_id: external_id.to_string(),
            first_target_id: first.to_string(),
            second_target_id: second.to_string(),
        }
    }

    pub fn duplicate_mapped_target(target_id: &str, first: &str, second: &str) -> Self {
        Self::DuplicateMappedTarget {
            target_id: target_id.to_string(),
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn path_collision(path: &str, external_id: &str, existing: Option<&str>) -> Self {
        Self::PathCollision {
            path: path.to_string(),
            external_id: external_id.to_string(),
            existing_external_id: existing.map(str::to_string),
        }
    }
}
