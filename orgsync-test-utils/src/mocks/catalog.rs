//! In-memory catalog for exercising the sync pipeline

use async_trait::async_trait;
use orgsync_core::catalog::{CatalogClient, ItemResult, UnitPayload, UnitUpdate};
use orgsync_core::error::CatalogError;
use orgsync_core::{CancellationToken, Metadata, TargetUnit, UnitRef};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// One item-level operation the mock accepted or refused, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    Create { external_id: String, title: String },
    Update { external_id: String, target_id: String },
    Delete { target_id: String, title: String },
}

impl CatalogCall {
    pub fn is_create(&self) -> bool {
        matches!(self, CatalogCall::Create { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, CatalogCall::Delete { .. })
    }
}

/// Catalog state plus the configured misbehavior.
///
/// Units hold their own external id attribute, so a mock seeded with
/// `seed_unit` can be adopted by a pass that starts from an empty mapping.
///
/// # Examples
///
/// ```rust,no_run
/// use orgsync_test_utils::MockCatalog;
///
/// let catalog = MockCatalog::new();
/// let root = catalog.seed_unit(Some("A"), "Alpha", None);
/// catalog.fail_transiently("B", 2);
/// assert_eq!(catalog.unit(&root).unwrap().title, "Alpha");
/// ```
#[derive(Clone, Default)]
pub struct MockCatalog {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    units: BTreeMap<String, StoredUnit>,
    calls: Vec<CatalogCall>,
    batches: usize,
    transient_failures: HashMap<String, u32>,
    rejected: HashSet<String>,
    batch_failures: VecDeque<CatalogError>,
    listing_failure: Option<CatalogError>,
    delay: Duration,
    cancel_after: Option<(usize, CancellationToken)>,
}

#[derive(Debug, Clone)]
struct StoredUnit {
    address: String,
    title: String,
    parent_target_id: Option<String>,
    external_id: Option<String>,
    metadata: Metadata,
}

impl MockState {
    fn path_of(&self, target_id: &str) -> Vec<String> {
        let mut path = Vec::new();
        let mut cursor = Some(target_id.to_string());
        while let Some(id) = cursor {
            let Some(unit) = self.units.get(&id) else {
                break;
            };
            path.push(unit.title.clone());
            cursor = unit.parent_target_id.clone();
            if path.len() > self.units.len() {
                break;
            }
        }
        path.reverse();
        path
    }

    fn snapshot(&self, target_id: &str, unit: &StoredUnit) -> TargetUnit {
        TargetUnit {
            target_id: target_id.to_string(),
            address: unit.address.clone(),
            path: self.path_of(target_id),
            title: unit.title.clone(),
            parent_target_id: unit.parent_target_id.clone(),
            external_id: unit.external_id.clone(),
            metadata: unit.metadata.clone(),
        }
    }

    fn has_children(&self, target_id: &str) -> bool {
        self.units
            .values()
            .any(|unit| unit.parent_target_id.as_deref() == Some(target_id))
    }

    /// Injected per-item failure for `key`, consuming one transient charge
    fn injected_failure(&mut self, key: &str) -> Option<CatalogError> {
        if self.rejected.contains(key) {
            return Some(CatalogError::rejected(
                Some(422),
                format!("unit '{key}' refused"),
            ));
        }
        if let Some(remaining) = self.transient_failures.get_mut(key)
            && *remaining > 0
        {
            *remaining -= 1;
            return Some(CatalogError::transient(format!("unit '{key}' busy")));
        }
        None
    }

    /// Count a bulk call; returns the whole-call failure if one is queued
    fn begin_batch(&mut self) -> Result<(), CatalogError> {
        self.batches += 1;
        if let Some((after, token)) = &self.cancel_after
            && self.batches >= *after
        {
            token.cancel();
        }
        match self.batch_failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn new_unit_id() -> (String, String) {
        let target_id = Uuid::new_v4().to_string();
        let address = format!("catalog://units/{target_id}");
        (target_id, address)
    }
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit directly, bypassing the call log. Returns its target id.
    pub fn seed_unit(
        &self,
        external_id: Option<&str>,
        title: &str,
        parent_target_id: Option<&str>,
    ) -> String {
        let (target_id, address) = MockState::new_unit_id();
        let mut state = self.state.lock().unwrap();
        state.units.insert(
            target_id.clone(),
            StoredUnit {
                address,
                title: title.to_string(),
                parent_target_id: parent_target_id.map(str::to_string),
                external_id: external_id.map(str::to_string),
                metadata: Metadata::new(),
            },
        );
        target_id
    }

    /// Set a metadata value on an existing unit
    pub fn set_metadata(&self, target_id: &str, key: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(unit) = state.units.get_mut(target_id) {
            unit.metadata.insert(key.to_string(), value.to_string());
        }
    }

    /// Rename an existing unit, as an operator editing the catalog would
    pub fn rename(&self, target_id: &str, title: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(unit) = state.units.get_mut(target_id) {
            unit.title = title.to_string();
        }
    }

    /// Place an existing unit under another container, as an operator would
    pub fn reparent(&self, target_id: &str, parent_target_id: Option<&str>) {
        let mut state = self.state.lock().unwrap();
        if let Some(unit) = state.units.get_mut(target_id) {
            unit.parent_target_id = parent_target_id.map(str::to_string);
        }
    }

    /// Fail item operations on `key` transiently for the next `times` attempts.
    /// `key` is the external id for creates and updates and the target id
    /// for deletes.
    pub fn fail_transiently(&self, key: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .transient_failures
            .insert(key.to_string(), times);
    }

    /// Refuse every operation on `key` with a permanent error
    pub fn reject(&self, key: &str) {
        self.state.lock().unwrap().rejected.insert(key.to_string());
    }

    /// Fail the next bulk call as a whole
    pub fn fail_next_batch(&self, error: CatalogError) {
        self.state.lock().unwrap().batch_failures.push_back(error);
    }

    /// Fail every listing call
    pub fn fail_listing(&self, error: CatalogError) {
        self.state.lock().unwrap().listing_failure = Some(error);
    }

    /// Delay every bulk call
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = delay;
    }

    /// Cancel `token` once `batches` bulk calls have been received
    pub fn cancel_after_batches(&self, batches: usize, token: CancellationToken) {
        self.state.lock().unwrap().cancel_after = Some((batches, token));
    }

    pub fn unit(&self, target_id: &str) -> Option<TargetUnit> {
        let state = self.state.lock().unwrap();
        state
            .units
            .get(target_id)
            .map(|unit| state.snapshot(target_id, unit))
    }

    pub fn unit_by_external_id(&self, external_id: &str) -> Option<TargetUnit> {
        let state = self.state.lock().unwrap();
        state
            .units
            .iter()
            .find(|(_, unit)| unit.external_id.as_deref() == Some(external_id))
            .map(|(target_id, unit)| state.snapshot(target_id, unit))
    }

    pub fn units(&self) -> Vec<TargetUnit> {
        let state = self.state.lock().unwrap();
        state
            .units
            .iter()
            .map(|(target_id, unit)| state.snapshot(target_id, unit))
            .collect()
    }

    pub fn unit_count(&self) -> usize {
        self.state.lock().unwrap().units.len()
    }

    /// Item operations received so far, including refused ones
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of bulk write calls received
    pub fn batch_count(&self) -> usize {
        self.state.lock().unwrap().batches
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.clear();
        state.batches = 0;
    }

    async fn pause(&self) {
        let delay = self.state.lock().unwrap().delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn apply_payload(
        state: &MockState,
        payload: &UnitPayload,
    ) -> Result<Option<String>, CatalogError> {
        match &payload.parent {
            Some(parent) if !state.units.contains_key(&parent.target_id) => {
                Err(CatalogError::not_found(&parent.target_id))
            }
            Some(parent) => Ok(Some(parent.target_id.clone())),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn list_units(&self) -> Result<Vec<TargetUnit>, CatalogError> {
        if let Some(err) = self.state.lock().unwrap().listing_failure.clone() {
            return Err(err);
        }
        Ok(self.units())
    }

    async fn create_units(
        &self,
        batch: &[UnitPayload],
    ) -> Result<Vec<ItemResult<UnitRef>>, CatalogError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.begin_batch()?;

        let mut results = Vec::with_capacity(batch.len());
        for payload in batch {
            state.calls.push(CatalogCall::Create {
                external_id: payload.external_id.clone(),
                title: payload.title.clone(),
            });
            if let Some(err) = state.injected_failure(&payload.external_id) {
                results.push(Err(err));
                continue;
            }
            let parent_target_id = match Self::apply_payload(&state, payload) {
                Ok(parent) => parent,
                Err(err) => {
                    results.push(Err(err));
                    continue;
                }
            };

            let (target_id, address) = MockState::new_unit_id();
            state.units.insert(
                target_id.clone(),
                StoredUnit {
                    address: address.clone(),
                    title: payload.title.clone(),
                    parent_target_id,
                    external_id: Some(payload.external_id.clone()),
                    metadata: payload.metadata.clone(),
                },
            );
            results.push(Ok(UnitRef { target_id, address }));
        }
        Ok(results)
    }

    async fn update_units(
        &self,
        batch: &[UnitUpdate],
    ) -> Result<Vec<ItemResult<UnitRef>>, CatalogError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.begin_batch()?;

        let mut results = Vec::with_capacity(batch.len());
        for update in batch {
            state.calls.push(CatalogCall::Update {
                external_id: update.payload.external_id.clone(),
                target_id: update.target_id.clone(),
            });
            if let Some(err) = state.injected_failure(&update.payload.external_id) {
                results.push(Err(err));
                continue;
            }
            if !state.units.contains_key(&update.target_id) {
                results.push(Err(CatalogError::not_found(&update.target_id)));
                continue;
            }
            let parent_target_id = match Self::apply_payload(&state, &update.payload) {
                Ok(parent) => parent,
                Err(err) => {
                    results.push(Err(err));
                    continue;
                }
            };

            let Some(unit) = state.units.get_mut(&update.target_id) else {
                results.push(Err(CatalogError::not_found(&update.target_id)));
                continue;
            };
            unit.title = update.payload.title.clone();
            unit.parent_target_id = parent_target_id;
            unit.external_id = Some(update.payload.external_id.clone());
            unit.metadata.extend(update.payload.metadata.clone());
            results.push(Ok(UnitRef {
                target_id: update.target_id.clone(),
                address: unit.address.clone(),
            }));
        }
        Ok(results)
    }

    async fn delete_units(
        &self,
        target_ids: &[String],
    ) -> Result<Vec<ItemResult<()>>, CatalogError> {
        self.pause().await;
        let mut state = self.state.lock().unwrap();
        state.begin_batch()?;

        let mut results = Vec::with_capacity(target_ids.len());
        for target_id in target_ids {
            let title = state
                .units
                .get(target_id)
                .map(|unit| unit.title.clone())
                .unwrap_or_default();
            state.calls.push(CatalogCall::Delete {
                target_id: target_id.clone(),
                title,
            });
            if let Some(err) = state.injected_failure(target_id) {
                results.push(Err(err));
                continue;
            }
            if !state.units.contains_key(target_id) {
                results.push(Err(CatalogError::not_found(target_id)));
                continue;
            }
            if state.has_children(target_id) {
                results.push(Err(CatalogError::rejected(
                    Some(409),
                    format!("collection {target_id} is not empty"),
                )));
                continue;
            }
            state.units.remove(target_id);
            results.push(Ok(()));
        }
        Ok(results)
    }
}
