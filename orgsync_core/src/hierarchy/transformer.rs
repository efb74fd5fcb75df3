use crate::error::StructuralError;
use crate::model::{OrgNode, OrgUnitRecord};
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::ops::Range;

/// Validated hierarchy, nodes grouped by level in breadth-first order
#[derive(Debug, Clone, Default)]
pub struct HierarchyTree {
    nodes: Vec<OrgNode>,
    index: HashMap<String, usize>,
    levels: Vec<Range<usize>>,
}

impl HierarchyTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, level-ascending
    pub fn nodes(&self) -> &[OrgNode] {
        &self.nodes
    }

    pub fn get(&self, external_id: &str) -> Option<&OrgNode> {
        self.index.get(external_id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains(&self, external_id: &str) -> bool {
        self.index.contains_key(external_id)
    }

    /// Number of levels
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> &[OrgNode] {
        self.levels
            .get(level)
            .map(|range| &self.nodes[range.clone()])
            .unwrap_or_default()
    }

    pub fn levels(&self) -> impl Iterator<Item = &[OrgNode]> {
        self.levels.iter().map(|range| &self.nodes[range.clone()])
    }
}

/// Interpret a raw parent reference; blank values and the tabular `nan` mean "no parent"
pub fn normalize_parent(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Build the leveled tree from flat records.
///
/// Fails without producing a partial tree when an id is empty or duplicated,
/// a title is blank, a parent reference does not resolve, or parent
/// references form a cycle.
pub fn build_tree(records: &[OrgUnitRecord]) -> Result<HierarchyTree, StructuralError> {
    let units = normalize(records)?;
    let positions: HashMap<&str, usize> = units
        .iter()
        .enumerate()
        .map(|(idx, unit)| (unit.external_id.as_str(), idx))
        .collect();

    check_orphans(&units, &positions)?;
    check_cycles(&units, &positions)?;

    let tree = assemble(&units);
    debug!(
        "Built hierarchy of {} units across {} levels",
        tree.len(),
        tree.depth()
    );
    Ok(tree)
}

fn normalize(records: &[OrgUnitRecord]) -> Result<Vec<OrgUnitRecord>, StructuralError> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut units = Vec::with_capacity(records.len());

    for (position, record) in records.iter().enumerate() {
        let external_id = record.external_id.trim();
        if external_id.is_empty() {
            return Err(StructuralError::EmptyExternalId { position });
        }
        if seen.insert(external_id.to_string(), position).is_some() {
            return Err(StructuralError::duplicate_external_id(external_id));
        }

        let title = record.title.trim();
        if title.is_empty() {
            return Err(StructuralError::empty_title(external_id));
        }

        units.push(OrgUnitRecord {
            external_id: external_id.to_string(),
            title: title.to_string(),
            parent_external_id: normalize_parent(record.parent_external_id.as_deref()),
            metadata: record.metadata.clone(),
        });
    }

    Ok(units)
}

fn check_orphans(
    units: &[OrgUnitRecord],
    positions: &HashMap<&str, usize>,
) -> Result<(), StructuralError> {
    let mut first = None;
    for unit in units {
        if let Some(parent) = unit.parent_external_id.as_deref()
            && !positions.contains_key(parent)
        {
            warn!(
                "Unit '{}' references unknown parent '{}'",
                unit.external_id, parent
            );
            first.get_or_insert_with(|| StructuralError::orphan_parent(&unit.external_id, parent));
        }
    }

    match first {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

fn check_cycles(
    units: &[OrgUnitRecord],
    positions: &HashMap<&str, usize>,
) -> Result<(), StructuralError> {
    let mut marks = vec![Visit::Unvisited; units.len()];

    for start in 0..units.len() {
        let mut chain: Vec<usize> = Vec::new();
        let mut current = Some(start);

        while let Some(idx) = current {
            match marks[idx] {
                Visit::Done => break,
                Visit::InProgress => {
                    // In-progress marks only exist on the current chain
                    let from = chain.iter().position(|&i| i == idx).unwrap_or(0);
                    let members = chain[from..]
                        .iter()
                        .map(|&i| units[i].external_id.clone())
                        .collect::<Vec<_>>();
                    warn!("Cycle detected: {}", members.join(" -> "));
                    return Err(StructuralError::cycle(members));
                }
                Visit::Unvisited => {
                    marks[idx] = Visit::InProgress;
                    chain.push(idx);
                    current = units[idx]
                        .parent_external_id
                        .as_deref()
                        .and_then(|parent| positions.get(parent).copied());
                }
            }
        }

        for idx in chain {
            marks[idx] = Visit::Done;
        }
    }

    Ok(())
}

fn assemble(units: &[OrgUnitRecord]) -> HierarchyTree {
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut queue: VecDeque<(usize, Option<usize>)> = VecDeque::new();

    for (idx, unit) in units.iter().enumerate() {
        match unit.parent_external_id.as_deref() {
            Some(parent) => children.entry(parent).or_default().push(idx),
            None => queue.push_back((idx, None)),
        }
    }

    let mut nodes: Vec<OrgNode> = Vec::with_capacity(units.len());
    while let Some((unit_idx, parent_node)) = queue.pop_front() {
        let unit = &units[unit_idx];
        let (level, mut path) = match parent_node {
            Some(parent) => (nodes[parent].level + 1, nodes[parent].path.clone()),
            None => (0, Vec::new()),
        };
        path.push(unit.title.clone());

        let node_idx = nodes.len();
        nodes.push(OrgNode {
            external_id: unit.external_id.clone(),
            title: unit.title.clone(),
            parent_external_id: unit.parent_external_id.clone(),
            level,
            path,
            metadata: unit.metadata.clone(),
        });

        if let Some(kids) = children.get(unit.external_id.as_str()) {
            queue.extend(kids.iter().map(|&kid| (kid, Some(node_idx))));
        }
    }

    let mut levels: Vec<Range<usize>> = Vec::new();
    for (idx, node) in nodes.iter().enumerate() {
        match levels.get_mut(node.level) {
            Some(range) => range.end = idx + 1,
            None => levels.push(idx..idx + 1),
        }
    }

    let index = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.external_id.clone(), idx))
        .collect();

    HierarchyTree {
        nodes,
        index,
        levels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(id: &str, title: &str, parent: Option<&str>) -> OrgUnitRecord {
        OrgUnitRecord::new(id, title, parent)
    }

    fn ids(nodes: &[OrgNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.external_id.as_str()).collect()
    }

    #[test]
    fn test_two_level_example() {
        let tree = build_tree(&[
            record("A", "Dept", None),
            record("B", "Office", Some("A")),
        ])
        .unwrap();

        let a = tree.get("A").unwrap();
        assert_eq!(a.level, 0);
        assert_eq!(a.path, vec!["Dept"]);

        let b = tree.get("B").unwrap();
        assert_eq!(b.level, 1);
        assert_eq!(b.path, vec!["Dept", "Office"]);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_children_before_parents_in_input() {
        let tree = build_tree(&[
            record("C", "Team", Some("B")),
            record("B", "Office", Some("A")),
            record("A", "Dept", None),
        ])
        .unwrap();

        assert_eq!(ids(tree.nodes()), vec!["A", "B", "C"]);
        assert_eq!(tree.get("C").unwrap().path, vec!["Dept", "Office", "Team"]);
    }

    #[test]
    fn test_order_follows_parent_discovery_then_input() {
        let tree = build_tree(&[
            record("R2", "Second", None),
            record("R1", "First", None),
            record("c1", "Under first", Some("R1")),
            record("c2", "Under second", Some("R2")),
            record("c3", "Also under second", Some("R2")),
        ])
        .unwrap();

        assert_eq!(ids(tree.level(0)), vec!["R2", "R1"]);
        assert_eq!(ids(tree.level(1)), vec!["c2", "c3", "c1"]);
        assert!(tree.level(2).is_empty());
    }

    #[test]
    fn test_titles_are_trimmed() {
        let tree = build_tree(&[record("A", "  Dept ", None)]).unwrap();
        assert_eq!(tree.get("A").unwrap().title, "Dept");
    }

    #[test]
    fn test_nan_and_blank_parents_are_roots() {
        let tree = build_tree(&[
            record("A", "Dept", Some("nan")),
            record("B", "Office", Some("  ")),
            record("C", "Other", Some("NaN")),
        ])
        .unwrap();

        assert!(tree.nodes().iter().all(|n| n.level == 0 && n.is_root()));
    }

    #[test]
    fn test_two_node_cycle_fails() {
        let err = build_tree(&[record("A", "Dept", Some("B")), record("B", "Office", Some("A"))])
            .unwrap_err();

        match err {
            StructuralError::Cycle { members } => {
                assert_eq!(members, vec!["A".to_string(), "B".to_string()]);
            }
            other => panic!("Expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let err = build_tree(&[record("A", "Dept", Some("A"))]).unwrap_err();
        assert_eq!(err, StructuralError::cycle(vec!["A".into()]));
    }

    #[test]
    fn test_cycle_hanging_off_valid_tree() {
        let err = build_tree(&[
            record("root", "Root", None),
            record("x", "X", Some("z")),
            record("y", "Y", Some("x")),
            record("z", "Z", Some("y")),
        ])
        .unwrap_err();
        assert!(matches!(err, StructuralError::Cycle { members } if members.len() == 3));
    }

    #[test]
    fn test_orphan_names_first_offender() {
        let err = build_tree(&[
            record("A", "Dept", None),
            record("B", "Office", Some("missing")),
            record("C", "Team", Some("also-missing")),
        ])
        .unwrap_err();

        assert_eq!(err, StructuralError::orphan_parent("B", "missing"));
    }

    #[test]
    fn test_duplicate_id_fails() {
        let err = build_tree(&[record("A", "Dept", None), record("A", "Again", None)]).unwrap_err();
        assert_eq!(err, StructuralError::duplicate_external_id("A"));
    }

    #[test]
    fn test_empty_id_and_title_fail() {
        let err = build_tree(&[record(" ", "Dept", None)]).unwrap_err();
        assert_eq!(err, StructuralError::EmptyExternalId { position: 0 });

        let err = build_tree(&[record("A", "   ", None)]).unwrap_err();
        assert_eq!(err, StructuralError::empty_title("A"));
    }

    #[test]
    fn test_empty_input_gives_empty_tree() {
        let tree = build_tree(&[]).unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
    }

    /// Helper turning (parent index choice, shuffle key) pairs into a random forest
    fn forest(shape: &[(Option<prop::sample::Index>, u32)]) -> Vec<OrgUnitRecord> {
        let mut records: Vec<(u32, OrgUnitRecord)> = shape
            .iter()
            .enumerate()
            .map(|(i, (parent, key))| {
                let parent_id = match parent {
                    Some(choice) if i > 0 => Some(format!("U{}", choice.index(i))),
                    _ => None,
                };
                let record = OrgUnitRecord {
                    external_id: format!("U{i}"),
                    title: format!("Unit {i}"),
                    parent_external_id: parent_id,
                    metadata: Default::default(),
                };
                (*key, record)
            })
            .collect();
        records.sort_by_key(|(key, _)| *key);
        records.into_iter().map(|(_, record)| record).collect()
    }

    proptest! {
        #[test]
        fn prop_levels_and_paths_follow_parents(
            shape in prop::collection::vec(
                (proptest::option::of(any::<prop::sample::Index>()), any::<u32>()),
                1..40,
            )
        ) {
            let records = forest(&shape);
            let tree = build_tree(&records).unwrap();
            prop_assert_eq!(tree.len(), records.len());

            let mut last_level = 0;
            for node in tree.nodes() {
                prop_assert!(node.level >= last_level);
                last_level = node.level;

                match node.parent_external_id.as_deref() {
                    None => {
                        prop_assert_eq!(node.level, 0);
                        prop_assert_eq!(node.path.clone(), vec![node.title.clone()]);
                    }
                    Some(parent_id) => {
                        let parent = tree.get(parent_id).unwrap();
                        prop_assert_eq!(node.level, parent.level + 1);
                        let mut expected = parent.path.clone();
                        expected.push(node.title.clone());
                        prop_assert_eq!(&node.path, &expected);
                    }
                }
            }
        }
    }
}
