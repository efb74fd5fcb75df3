//! Directory source serving a fixed, swappable record set

use async_trait::async_trait;
use orgsync_core::catalog::DirectorySource;
use orgsync_core::error::SourceError;
use orgsync_core::OrgUnitRecord;
use std::sync::{Arc, Mutex};

/// Directory that returns whatever records it currently holds.
///
/// Clones share state, so a test can keep a handle and replace the records
/// between passes after handing the directory to an orchestrator.
#[derive(Clone, Default)]
pub struct StaticDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

#[derive(Default)]
struct DirectoryState {
    records: Vec<OrgUnitRecord>,
    failure: Option<SourceError>,
    fetches: usize,
}

impl StaticDirectory {
    pub fn new(records: Vec<OrgUnitRecord>) -> Self {
        let directory = Self::default();
        directory.set_records(records);
        directory
    }

    pub fn set_records(&self, records: Vec<OrgUnitRecord>) {
        self.state.lock().unwrap().records = records;
    }

    /// Fail every fetch until cleared with `recover`
    pub fn fail_with(&self, error: SourceError) {
        self.state.lock().unwrap().failure = Some(error);
    }

    pub fn recover(&self) {
        self.state.lock().unwrap().failure = None;
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().unwrap().fetches
    }
}

#[async_trait]
impl DirectorySource for StaticDirectory {
    async fn fetch_units(&self) -> Result<Vec<OrgUnitRecord>, SourceError> {
        let mut state = self.state.lock().unwrap();
        state.fetches += 1;
        match &state.failure {
            Some(err) => Err(err.clone()),
            None => Ok(state.records.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_can_be_swapped_between_fetches() {
        let directory = StaticDirectory::new(vec![OrgUnitRecord::new("A", "Alpha", None)]);
        let handle = directory.clone();

        assert_eq!(directory.fetch_units().await.unwrap().len(), 1);
        handle.set_records(Vec::new());
        assert!(directory.fetch_units().await.unwrap().is_empty());
        assert_eq!(handle.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_until_recovered() {
        let directory = StaticDirectory::default();
        directory.fail_with(SourceError::unavailable("offline"));
        assert!(directory.fetch_units().await.is_err());
        directory.recover();
        assert!(directory.fetch_units().await.is_ok());
    }
}
