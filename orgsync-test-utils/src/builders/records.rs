use orgsync_core::OrgUnitRecord;

/// Fluent construction of directory record sets
///
/// # Examples
///
/// ```rust
/// use orgsync_test_utils::HierarchyBuilder;
///
/// let records = HierarchyBuilder::new()
///     .root("A", "Alpha")
///     .child("B", "Beta", "A")
///     .with_metadata("link", "https://example.org/b")
///     .build();
/// assert_eq!(records.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HierarchyBuilder {
    records: Vec<OrgUnitRecord>,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record set
    pub fn from_records(records: Vec<OrgUnitRecord>) -> Self {
        Self { records }
    }

    pub fn root(mut self, external_id: &str, title: &str) -> Self {
        self.records
            .push(OrgUnitRecord::new(external_id, title, None));
        self
    }

    pub fn child(mut self, external_id: &str, title: &str, parent: &str) -> Self {
        self.records
            .push(OrgUnitRecord::new(external_id, title, Some(parent)));
        self
    }

    /// Attach metadata to the most recently added record
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        if let Some(last) = self.records.pop() {
            self.records.push(last.with_metadata(key, value));
        }
        self
    }

    /// Rename a record already in the set
    pub fn retitle(mut self, external_id: &str, title: &str) -> Self {
        if let Some(record) = self.find(external_id) {
            record.title = title.to_string();
        }
        self
    }

    /// Move a record under another parent, or to the root with `None`
    pub fn reparent(mut self, external_id: &str, parent: Option<&str>) -> Self {
        if let Some(record) = self.find(external_id) {
            record.parent_external_id = parent.map(str::to_string);
        }
        self
    }

    pub fn remove(mut self, external_id: &str) -> Self {
        self.records.retain(|record| record.external_id != external_id);
        self
    }

    pub fn build(self) -> Vec<OrgUnitRecord> {
        self.records
    }

    fn find(&mut self, external_id: &str) -> Option<&mut OrgUnitRecord> {
        self.records
            .iter_mut()
            .find(|record| record.external_id == external_id)
    }
}

/// Records for a complete tree with `breadth` children per unit, `depth`
/// levels deep. Ids encode the position, e.g. `U0`, `U0.1`, `U0.1.0`.
pub fn balanced_hierarchy(depth: usize, breadth: usize) -> Vec<OrgUnitRecord> {
    let mut records = Vec::new();
    let mut frontier: Vec<String> = Vec::new();

    for level in 0..depth {
        let mut next = Vec::new();
        if level == 0 {
            for i in 0..breadth {
                let id = format!("U{i}");
                records.push(OrgUnitRecord::new(&id, &format!("Unit {i}"), None));
                next.push(id);
            }
        } else {
            for parent in &frontier {
                for i in 0..breadth {
                    let id = format!("{parent}.{i}");
                    let title = format!("Unit {}", &id[1..]);
                    records.push(OrgUnitRecord::new(&id, &title, Some(parent.as_str())));
                    next.push(id);
                }
            }
        }
        frontier = next;
    }
    records
}
