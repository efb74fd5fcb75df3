//! Collaborator interfaces: the directory the hierarchy comes from and the
//! catalog it is written to.

use crate::error::{CatalogError, SourceError};
use crate::model::{Metadata, OrgUnitRecord, TargetUnit, UnitRef};
use async_trait::async_trait;
use serde::Serialize;

/// Result of one item inside a bulk call
pub type ItemResult<T> = Result<T, CatalogError>;

/// Location a unit is placed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentLocation {
    pub target_id: String,
    /// Escaped hierarchical path of the parent collection
    pub path: String,
}

/// Unit contents sent on create and update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitPayload {
    pub external_id: String,
    pub title: String,
    /// None places the unit directly under the managed root
    pub parent: Option<ParentLocation>,
    pub metadata: Metadata,
}

/// Payload addressed to an existing unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitUpdate {
    pub target_id: String,
    pub payload: UnitPayload,
}

/// Source of flat organizational records
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Fetch every unit; pagination is the implementation's concern
    async fn fetch_units(&self) -> Result<Vec<OrgUnitRecord>, SourceError>;
}

/// Catalog holding the mirrored hierarchy.
///
/// Bulk calls return one result per input item, in input order, or fail as
/// a whole.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// All units under the managed root
    async fn list_units(&self) -> Result<Vec<TargetUnit>, CatalogError>;

    async fn create_units(
        &self,
        batch: &[UnitPayload],
    ) -> Result<Vec<ItemResult<UnitRef>>, CatalogError>;

    /// Field updates and parent moves
    async fn update_units(
        &self,
        batch: &[UnitUpdate],
    ) -> Result<Vec<ItemResult<UnitRef>>, CatalogError>;

    async fn delete_units(&self, target_ids: &[String])
    -> Result<Vec<ItemResult<()>>, CatalogError>;
}
