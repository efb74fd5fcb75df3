use super::strategy::CompareStrategy;
use crate::error::MappingIntegrityError;
use crate::hierarchy::{HierarchyTree, PathEscaping};
use crate::mapping::MappingEntry;
use crate::model::{
    ChangeKind, FieldChange, Metadata, OrgNode, OrgUnitChange, ParentRef, TargetUnit,
    UnitSnapshot,
};
use log::{debug, info, warn};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

/// Live unit resolved to an external id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveBinding {
    pub external_id: String,
    pub unit: TargetUnit,
    /// Bound through the unit's own external id attribute, not the mapping
    pub adopted: bool,
}

/// Everything the orchestrator needs after comparison
#[derive(Debug, Clone, Default)]
pub struct ComparisonOutcome {
    /// Create, update and move level-ascending, then deletes level-descending
    pub changes: Vec<OrgUnitChange>,
    /// Unchanged units whose mapping entry must be written from the live listing
    pub refreshed: Vec<LiveBinding>,
    /// External ids whose mapping entry points at a unit that no longer exists
    pub stale_entries: Vec<String>,
    pub unchanged: usize,
}

impl ComparisonOutcome {
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Computes the change set between the desired tree and the catalog
#[derive(Debug, Clone, Default)]
pub struct HierarchyComparer {
    strategy: CompareStrategy,
    escaping: PathEscaping,
}

#[derive(Clone, Copy)]
struct Bound<'a> {
    unit: &'a TargetUnit,
    adopted: bool,
}

/// Where a matched unit currently sits in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurrentParent<'a> {
    Root,
    /// Under a unit bound to this external id
    Managed(&'a str),
    /// Under a container no external id is bound to
    Unmanaged,
}

impl<'a> CurrentParent<'a> {
    fn external_id(self) -> Option<&'a str> {
        match self {
            Self::Managed(external_id) => Some(external_id),
            Self::Root | Self::Unmanaged => None,
        }
    }
}

impl HierarchyComparer {
    pub fn new(strategy: CompareStrategy) -> Self {
        Self {
            strategy,
            escaping: PathEscaping::default(),
        }
    }

    /// Escaping used for the parent paths kept in mapping entries
    pub fn with_escaping(mut self, escaping: PathEscaping) -> Self {
        self.escaping = escaping;
        self
    }

    pub fn strategy(&self) -> &CompareStrategy {
        &self.strategy
    }

    pub fn compare(
        &self,
        tree: &HierarchyTree,
        mapping: &[MappingEntry],
        live: &[TargetUnit],
    ) -> Result<ComparisonOutcome, MappingIntegrityError> {
        let mut mapped_targets: HashMap<&str, &str> = HashMap::with_capacity(mapping.len());
        for entry in mapping {
            if let Some(previous) =
                mapped_targets.insert(entry.target_id.as_str(), entry.external_id.as_str())
            {
                return Err(MappingIntegrityError::duplicate_mapped_target(
                    &entry.target_id,
                    previous,
                    &entry.external_id,
                ));
            }
        }
        let mapping_by_external: HashMap<&str, &MappingEntry> = mapping
            .iter()
            .map(|entry| (entry.external_id.as_str(), entry))
            .collect();

        let (bound, external_of_target) = bind_live_units(live, &mapped_targets)?;
        let occupied: HashMap<&[String], &TargetUnit> = live
            .iter()
            .map(|unit| (unit.path.as_slice(), unit))
            .collect();

        let mut outcome = ComparisonOutcome::default();

        let live_targets: HashSet<&str> = live.iter().map(|unit| unit.target_id.as_str()).collect();
        for entry in mapping {
            if !live_targets.contains(entry.target_id.as_str()) {
                warn!(
                    "Mapping entry '{}' points at missing catalog unit {}",
                    entry.external_id, entry.target_id
                );
                outcome.stale_entries.push(entry.external_id.clone());
            }
        }

        for node in tree.nodes() {
            let parent = parent_ref(node, &bound);
            match bound.get(node.external_id.as_str()) {
                Some(found) => {
                    let current_parent = match found.unit.parent_target_id.as_deref() {
                        None => CurrentParent::Root,
                        Some(target) => match external_of_target.get(target) {
                            Some(&external_id) => CurrentParent::Managed(external_id),
                            None => CurrentParent::Unmanaged,
                        },
                    };

                    match self.diff_matched(node, found.unit, current_parent, parent) {
                        Some(change) => outcome.changes.push(change),
                        None => {
                            outcome.unchanged += 1;
                            let entry = mapping_by_external.get(node.external_id.as_str());
                            if found.adopted || self.drifted(entry.copied(), found.unit) {
                                outcome.refreshed.push(LiveBinding {
                                    external_id: node.external_id.clone(),
                                    unit: found.unit.clone(),
                                    adopted: found.adopted,
                                });
                            }
                        }
                    }
                }
                None => {
                    if let Some(holder) = occupied.get(node.path.as_slice()) {
                        let holder_external = external_of_target
                            .get(holder.target_id.as_str())
                            .copied();
                        return Err(MappingIntegrityError::path_collision(
                            &node.path.join("/"),
                            &node.external_id,
                            holder_external,
                        ));
                    }
                    outcome.changes.push(self.creation(node, parent));
                }
            }
        }

        let mut deletions: Vec<OrgUnitChange> = bound
            .iter()
            .filter(|(external_id, _)| !tree.contains(external_id))
            .map(|(external_id, found)| {
                let current_parent = found
                    .unit
                    .parent_target_id
                    .as_deref()
                    .and_then(|target| external_of_target.get(target).copied());
                deletion(external_id, found.unit, current_parent)
            })
            .collect();
        deletions.sort_by(|a, b| {
            let a_path = a.before.as_ref().map(|s| &s.path);
            let b_path = b.before.as_ref().map(|s| &s.path);
            (Reverse(a.level), a_path, &a.external_id).cmp(&(Reverse(b.level), b_path, &b.external_id))
        });
        outcome.changes.extend(deletions);

        info!(
            "Comparison complete: {} to create, {} to update, {} to move, {} to delete, {} unchanged",
            outcome.count(ChangeKind::Create),
            outcome.count(ChangeKind::UpdateFields),
            outcome.count(ChangeKind::MoveParent),
            outcome.count(ChangeKind::Delete),
            outcome.unchanged
        );
        Ok(outcome)
    }

    fn diff_matched(
        &self,
        node: &OrgNode,
        unit: &TargetUnit,
        current_parent: CurrentParent<'_>,
        parent: ParentRef,
    ) -> Option<OrgUnitChange> {
        let mut fields = Vec::new();
        if !self.strategy.titles_equal(&unit.title, &node.title) {
            fields.push(FieldChange::new(
                "title",
                Some(unit.title.as_str()),
                Some(node.title.as_str()),
            ));
        }
        fields.extend(self.strategy.field_changes(&unit.metadata, &node.metadata));

        let desired_parent = node.parent_external_id.as_deref();
        let moved = match current_parent {
            CurrentParent::Root => desired_parent.is_some(),
            CurrentParent::Managed(external_id) => desired_parent != Some(external_id),
            // Containers outside the managed tree never hold a managed unit
            CurrentParent::Unmanaged => true,
        };
        if moved {
            let old = match current_parent {
                CurrentParent::Root => None,
                CurrentParent::Managed(external_id) => Some(external_id.to_string()),
                CurrentParent::Unmanaged => Some(self.escaping.join(unit.parent_path())),
            };
            fields.push(FieldChange::new("parent", old.as_deref(), desired_parent));
        }

        let kind = if moved {
            ChangeKind::MoveParent
        } else if !fields.is_empty() {
            ChangeKind::UpdateFields
        } else {
            return None;
        };
        debug!("Unit '{}' needs {kind}", node.external_id);

        Some(OrgUnitChange {
            external_id: node.external_id.clone(),
            kind,
            level: node.level,
            target_id: Some(unit.target_id.clone()),
            before: Some(self.unit_snapshot(unit, current_parent.external_id())),
            after: Some(self.node_snapshot(node, &parent)),
            fields,
            parent,
        })
    }

    fn creation(&self, node: &OrgNode, parent: ParentRef) -> OrgUnitChange {
        let after = self.node_snapshot(node, &parent);
        let mut fields = vec![FieldChange::new("title", None, Some(node.title.as_str()))];
        fields.extend(
            after
                .metadata
                .iter()
                .map(|(field, value)| FieldChange::new(field, None, Some(value.as_str()))),
        );

        OrgUnitChange {
            external_id: node.external_id.clone(),
            kind: ChangeKind::Create,
            level: node.level,
            target_id: None,
            before: None,
            after: Some(after),
            fields,
            parent,
        }
    }

    fn node_snapshot(&self, node: &OrgNode, parent: &ParentRef) -> UnitSnapshot {
        let parent_target_id = match parent {
            ParentRef::Existing { target_id, .. } => Some(target_id.clone()),
            ParentRef::Root | ParentRef::Pending { .. } => None,
        };
        UnitSnapshot {
            title: node.title.clone(),
            parent_external_id: node.parent_external_id.clone(),
            parent_target_id,
            path: node.path.clone(),
            metadata: self.strategy.tracked_metadata(&node.metadata),
        }
    }

    fn unit_snapshot(&self, unit: &TargetUnit, parent_external_id: Option<&str>) -> UnitSnapshot {
        snapshot_of(unit, parent_external_id, self.strategy.tracked_metadata(&unit.metadata))
    }

    /// Stored entry no longer describes the live unit
    fn drifted(&self, entry: Option<&MappingEntry>, unit: &TargetUnit) -> bool {
        match entry {
            None => true,
            Some(entry) => {
                entry.target_address != unit.address
                    || entry.title != unit.title
                    || entry.parent_collection_path != self.escaping.join(unit.parent_path())
            }
        }
    }
}

fn snapshot_of(
    unit: &TargetUnit,
    parent_external_id: Option<&str>,
    metadata: Metadata,
) -> UnitSnapshot {
    UnitSnapshot {
        title: unit.title.clone(),
        parent_external_id: parent_external_id.map(str::to_string),
        parent_target_id: unit.parent_target_id.clone(),
        path: unit.path.clone(),
        metadata,
    }
}

type Bindings<'a> = (HashMap<&'a str, Bound<'a>>, HashMap<&'a str, &'a str>);

/// Resolve each live unit to an external id through the mapping, falling back
/// to the id stored on the unit itself
fn bind_live_units<'a>(
    live: &'a [TargetUnit],
    mapped_targets: &HashMap<&'a str, &'a str>,
) -> Result<Bindings<'a>, MappingIntegrityError> {
    let mut bound: HashMap<&str, Bound<'_>> = HashMap::with_capacity(live.len());
    let mut external_of_target: HashMap<&str, &str> = HashMap::with_capacity(live.len());

    for unit in live {
        let (external_id, adopted) = match mapped_targets.get(unit.target_id.as_str()) {
            Some(&external_id) => (external_id, false),
            None => match unit.external_id.as_deref().map(str::trim) {
                Some(external_id) if !external_id.is_empty() => (external_id, true),
                _ => continue,
            },
        };

        if let Some(previous) = bound.insert(external_id, Bound { unit, adopted }) {
            return Err(MappingIntegrityError::duplicate_live_external_id(
                external_id,
                &previous.unit.target_id,
                &unit.target_id,
            ));
        }
        external_of_target.insert(unit.target_id.as_str(), external_id);
    }

    Ok((bound, external_of_target))
}

fn parent_ref(node: &OrgNode, bound: &HashMap<&str, Bound<'_>>) -> ParentRef {
    match node.parent_external_id.as_deref() {
        None => ParentRef::Root,
        Some(parent) => match bound.get(parent) {
            Some(found) => ParentRef::Existing {
                external_id: parent.to_string(),
                target_id: found.unit.target_id.clone(),
            },
            None => ParentRef::Pending {
                external_id: parent.to_string(),
            },
        },
    }
}

fn deletion(external_id: &str, unit: &TargetUnit, parent_external_id: Option<&str>) -> OrgUnitChange {
    let parent = match (parent_external_id, unit.parent_target_id.as_deref()) {
        (Some(external_id), Some(target_id)) => ParentRef::Existing {
            external_id: external_id.to_string(),
            target_id: target_id.to_string(),
        },
        _ => ParentRef::Root,
    };

    OrgUnitChange {
        external_id: external_id.to_string(),
        kind: ChangeKind::Delete,
        level: unit.level(),
        target_id: Some(unit.target_id.clone()),
        before: Some(snapshot_of(unit, parent_external_id, unit.metadata.clone())),
        after: None,
        fields: vec![FieldChange::new("title", Some(unit.title.as_str()), None)],
        parent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::build_tree;
    use crate::model::OrgUnitRecord;

    /// Helper describing a live catalog unit
    fn live(target: &str, path: &[&str], parent: Option<&str>, external: Option<&str>) -> TargetUnit {
        TargetUnit {
            target_id: target.to_string(),
            address: format!("/rest/db/collections/{target}"),
            path: path.iter().map(|s| s.to_string()).collect(),
            title: path.last().map(|s| s.to_string()).unwrap_or_default(),
            parent_target_id: parent.map(str::to_string),
            external_id: external.map(str::to_string),
            metadata: Metadata::new(),
        }
    }

    fn entry(external: &str, unit: &TargetUnit) -> MappingEntry {
        MappingEntry {
            external_id: external.to_string(),
            target_id: unit.target_id.clone(),
            target_address: unit.address.clone(),
            parent_collection_path: unit.parent_path().join("/"),
            title: unit.title.clone(),
        }
    }

    fn record(id: &str, title: &str, parent: Option<&str>) -> OrgUnitRecord {
        OrgUnitRecord::new(id, title, parent)
    }

    fn kinds(outcome: &ComparisonOutcome) -> Vec<(ChangeKind, &str)> {
        outcome
            .changes
            .iter()
            .map(|c| (c.kind, c.external_id.as_str()))
            .collect()
    }

    fn comparer() -> HierarchyComparer {
        HierarchyComparer::new(CompareStrategy::default())
    }

    #[test]
    fn test_empty_catalog_creates_everything_in_tree_order() {
        let tree = build_tree(&[
            record("B", "Office", Some("A")),
            record("A", "Dept", None),
        ])
        .unwrap();

        let outcome = comparer().compare(&tree, &[], &[]).unwrap();
        assert_eq!(
            kinds(&outcome),
            vec![(ChangeKind::Create, "A"), (ChangeKind::Create, "B")]
        );
        assert_eq!(outcome.changes[0].parent, ParentRef::Root);
        assert_eq!(
            outcome.changes[1].parent,
            ParentRef::Pending {
                external_id: "A".into()
            }
        );
    }

    #[test]
    fn test_matching_state_yields_no_changes() {
        let tree = build_tree(&[record("A", "Dept", None), record("B", "Office", Some("A"))])
            .unwrap();
        let a = live("t-a", &["Dept"], None, None);
        let b = live("t-b", &["Dept", "Office"], Some("t-a"), None);
        let mapping = vec![entry("A", &a), entry("B", &b)];

        let outcome = comparer().compare(&tree, &mapping, &[a, b]).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.unchanged, 2);
        assert!(outcome.refreshed.is_empty());
        assert!(outcome.stale_entries.is_empty());
    }

    #[test]
    fn test_rename_is_field_update() {
        let tree = build_tree(&[record("A", "Department", None)]).unwrap();
        let a = live("t-a", &["Dept"], None, None);
        let mapping = vec![entry("A", &a)];

        let outcome = comparer().compare(&tree, &mapping, &[a]).unwrap();
        assert_eq!(kinds(&outcome), vec![(ChangeKind::UpdateFields, "A")]);
        assert_eq!(
            outcome.changes[0].fields,
            vec![FieldChange::new("title", Some("Dept"), Some("Department"))]
        );
        assert_eq!(outcome.changes[0].target_id.as_deref(), Some("t-a"));
    }

    #[test]
    fn test_tracked_link_change_is_field_update() {
        let tree = build_tree(&[
            record("A", "Dept", None).with_metadata("link", "https://new"),
        ])
        .unwrap();
        let mut a = live("t-a", &["Dept"], None, None);
        a.metadata.insert("link".into(), "https://old".into());
        let mapping = vec![entry("A", &a)];

        let outcome = comparer().compare(&tree, &mapping, &[a]).unwrap();
        assert_eq!(kinds(&outcome), vec![(ChangeKind::UpdateFields, "A")]);
        assert_eq!(outcome.changes[0].fields[0].field, "link");

        let outcome = HierarchyComparer::new(CompareStrategy::titles_only())
            .compare(&tree, &mapping, &[live("t-a", &["Dept"], None, None)])
            .unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_parent_change_is_move() {
        let tree = build_tree(&[
            record("A", "Dept", None),
            record("X", "Other", None),
            record("B", "Office", Some("X")),
        ])
        .unwrap();
        let a = live("t-a", &["Dept"], None, None);
        let x = live("t-x", &["Other"], None, None);
        let b = live("t-b", &["Dept", "Office"], Some("t-a"), None);
        let mapping = vec![entry("A", &a), entry("X", &x), entry("B", &b)];

        let outcome = comparer().compare(&tree, &mapping, &[a, x, b]).unwrap();
        assert_eq!(kinds(&outcome), vec![(ChangeKind::MoveParent, "B")]);

        let change = &outcome.changes[0];
        assert_eq!(
            change.parent,
            ParentRef::Existing {
                external_id: "X".into(),
                target_id: "t-x".into()
            }
        );
        assert_eq!(
            change.before.as_ref().unwrap().parent_target_id.as_deref(),
            Some("t-a")
        );
        assert!(change.fields.contains(&FieldChange::new("parent", Some("A"), Some("X"))));
    }

    #[test]
    fn test_replace_child_creates_before_deleting() {
        let tree = build_tree(&[record("A", "Dept", None), record("C", "Lab", Some("A"))])
            .unwrap();
        let a = live("t-a", &["Dept"], None, None);
        let b = live("t-b", &["Dept", "Office"], Some("t-a"), None);
        let mapping = vec![entry("A", &a), entry("B", &b)];

        let outcome = comparer().compare(&tree, &mapping, &[a, b]).unwrap();
        assert_eq!(
            kinds(&outcome),
            vec![(ChangeKind::Create, "C"), (ChangeKind::Delete, "B")]
        );
        assert_eq!(
            outcome.changes[0].parent,
            ParentRef::Existing {
                external_id: "A".into(),
                target_id: "t-a".into()
            }
        );
    }

    #[test]
    fn test_deletions_run_deepest_first() {
        let tree = build_tree(&[record("K", "Keep", None)]).unwrap();
        let k = live("t-k", &["Keep"], None, None);
        let a = live("t-a", &["Dept"], None, None);
        let b = live("t-b", &["Dept", "Office"], Some("t-a"), None);
        let c = live("t-c", &["Dept", "Office", "Team"], Some("t-b"), None);
        let mapping = vec![entry("K", &k), entry("A", &a), entry("B", &b), entry("C", &c)];

        let outcome = comparer().compare(&tree, &mapping, &[a, k, c, b]).unwrap();
        assert_eq!(
            kinds(&outcome),
            vec![
                (ChangeKind::Delete, "C"),
                (ChangeKind::Delete, "B"),
                (ChangeKind::Delete, "A"),
            ]
        );
        let levels: Vec<usize> = outcome.changes.iter().map(|c| c.level).collect();
        assert_eq!(levels, vec![2, 1, 0]);
    }

    #[test]
    fn test_stale_entry_is_pruned_and_recreated() {
        let tree = build_tree(&[record("A", "Dept", None)]).unwrap();
        let ghost = live("t-gone", &["Dept"], None, None);
        let mapping = vec![entry("A", &ghost)];

        let outcome = comparer().compare(&tree, &mapping, &[]).unwrap();
        assert_eq!(outcome.stale_entries, vec!["A".to_string()]);
        assert_eq!(kinds(&outcome), vec![(ChangeKind::Create, "A")]);
    }

    #[test]
    fn test_unit_carrying_external_id_is_adopted() {
        let tree = build_tree(&[record("A", "Dept", None)]).unwrap();
        let a = live("t-a", &["Dept"], None, Some("A"));

        let outcome = comparer().compare(&tree, &[], &[a]).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.refreshed.len(), 1);
        assert!(outcome.refreshed[0].adopted);
        assert_eq!(outcome.refreshed[0].unit.target_id, "t-a");
    }

    #[test]
    fn test_drifted_address_is_refreshed() {
        let tree = build_tree(&[record("A", "Dept", None)]).unwrap();
        let a = live("t-a", &["Dept"], None, None);
        let mut stored = entry("A", &a);
        stored.target_address = "/old/address".into();

        let outcome = comparer().compare(&tree, &[stored], &[a]).unwrap();
        assert_eq!(outcome.refreshed.len(), 1);
        assert!(!outcome.refreshed[0].adopted);
    }

    #[test]
    fn test_stale_parent_path_is_refreshed() {
        let tree = build_tree(&[record("A", "Department", None), record("B", "Office", Some("A"))])
            .unwrap();
        let a = live("t-a", &["Department"], None, None);
        let b = live("t-b", &["Department", "Office"], Some("t-a"), None);
        let mut stored_b = entry("B", &b);
        stored_b.parent_collection_path = "Dept".into();
        let mapping = vec![entry("A", &a), stored_b];

        let outcome = comparer().compare(&tree, &mapping, &[a, b]).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.refreshed.len(), 1);
        assert_eq!(outcome.refreshed[0].external_id, "B");
    }

    #[test]
    fn test_parent_path_uses_configured_escaping() {
        let tree = build_tree(&[record("A", "R&D/IT", None), record("B", "Office", Some("A"))])
            .unwrap();
        let a = live("t-a", &["R&D/IT"], None, None);
        let b = live("t-b", &["R&D/IT", "Office"], Some("t-a"), None);
        let mut stored_b = entry("B", &b);
        stored_b.parent_collection_path = "\"R&D/IT\"".into();
        let mapping = vec![entry("A", &a), stored_b];

        let outcome = comparer()
            .compare(&tree, &mapping, &[a.clone(), b.clone()])
            .unwrap();
        assert!(outcome.refreshed.is_empty());

        let outcome = comparer()
            .with_escaping(PathEscaping::Plain)
            .compare(&tree, &mapping, &[a, b])
            .unwrap();
        assert_eq!(outcome.refreshed.len(), 1);
    }

    #[test]
    fn test_unit_under_unmanaged_container_moves_back_to_root() {
        let tree = build_tree(&[record("A", "Dept", None)]).unwrap();
        let manual = live("t-m", &["Manual"], None, None);
        let a = live("t-a", &["Manual", "Dept"], Some("t-m"), None);
        let mapping = vec![entry("A", &a)];

        let outcome = comparer().compare(&tree, &mapping, &[manual, a]).unwrap();
        assert_eq!(kinds(&outcome), vec![(ChangeKind::MoveParent, "A")]);
        assert_eq!(outcome.unchanged, 0);

        let change = &outcome.changes[0];
        assert_eq!(change.parent, ParentRef::Root);
        assert!(change.fields.contains(&FieldChange::new("parent", Some("Manual"), None)));
        assert!(change.before.as_ref().unwrap().parent_external_id.is_none());
    }

    #[test]
    fn test_child_under_unmanaged_container_moves_to_desired_parent() {
        let tree = build_tree(&[record("A", "Dept", None), record("B", "Office", Some("A"))])
            .unwrap();
        let a = live("t-a", &["Dept"], None, None);
        let manual = live("t-m", &["Dept", "Manual"], Some("t-a"), None);
        let b = live("t-b", &["Dept", "Manual", "Office"], Some("t-m"), None);
        let mapping = vec![entry("A", &a), entry("B", &b)];

        let outcome = comparer().compare(&tree, &mapping, &[a, manual, b]).unwrap();
        assert_eq!(kinds(&outcome), vec![(ChangeKind::MoveParent, "B")]);
        assert_eq!(
            outcome.changes[0].parent,
            ParentRef::Existing {
                external_id: "A".into(),
                target_id: "t-a".into()
            }
        );
    }

    #[test]
    fn test_orphaned_catalog_units_without_ids_are_ignored() {
        let tree = build_tree(&[record("A", "Dept", None)]).unwrap();
        let a = live("t-a", &["Dept"], None, None);
        let manual = live("t-m", &["Manual"], None, None);
        let mapping = vec![entry("A", &a)];

        let outcome = comparer().compare(&tree, &mapping, &[a, manual]).unwrap();
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_two_units_claiming_one_id_fail() {
        let tree = build_tree(&[record("A", "Dept", None)]).unwrap();
        let first = live("t-1", &["Dept"], None, Some("A"));
        let second = live("t-2", &["Dept copy"], None, Some("A"));

        let err = comparer().compare(&tree, &[], &[first, second]).unwrap_err();
        assert!(matches!(err, MappingIntegrityError::DuplicateLiveExternalId { .. }));
    }

    #[test]
    fn test_two_entries_for_one_target_fail() {
        let tree = build_tree(&[record("A", "Dept", None)]).unwrap();
        let a = live("t-a", &["Dept"], None, None);
        let mapping = vec![entry("A", &a), entry("B", &a)];

        let err = comparer().compare(&tree, &mapping, &[a]).unwrap_err();
        assert_eq!(
            err,
            MappingIntegrityError::duplicate_mapped_target("t-a", "A", "B")
        );
    }

    #[test]
    fn test_creation_onto_occupied_path_fails() {
        let tree = build_tree(&[record("NEW", "Dept", None)]).unwrap();
        let a = live("t-a", &["Dept"], None, None);
        let mapping = vec![entry("OLD", &a)];

        let err = comparer().compare(&tree, &mapping, &[a]).unwrap_err();
        assert_eq!(
            err,
            MappingIntegrityError::path_collision("Dept", "NEW", Some("OLD"))
        );
    }

    #[test]
    fn test_creation_onto_path_of_unit_moving_away_fails() {
        let tree = build_tree(&[
            record("X", "Other", None),
            record("OLD", "Dept", Some("X")),
            record("NEW", "Dept", None),
        ])
        .unwrap();
        let x = live("t-x", &["Other"], None, None);
        let a = live("t-a", &["Dept"], None, None);
        let mapping = vec![entry("X", &x), entry("OLD", &a)];

        let err = comparer().compare(&tree, &mapping, &[x, a]).unwrap_err();
        assert_eq!(
            err,
            MappingIntegrityError::path_collision("Dept", "NEW", Some("OLD"))
        );
    }
}
