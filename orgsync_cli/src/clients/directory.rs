//! Directory sources: a JSON export on disk and a paginated records API

use async_trait::async_trait;
use log::{debug, info, warn};
use orgsync_core::catalog::DirectorySource;
use orgsync_core::error::SourceError;
use orgsync_core::hierarchy::normalize_parent;
use orgsync_core::{OrgUnitRecord, compare::LINK_FIELD};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Record as published by the directory
#[derive(Debug, Deserialize)]
struct DirectoryRow {
    id: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    parent_id: Value,
    #[serde(default)]
    url_website: Option<String>,
}

impl DirectoryRow {
    fn into_record(self) -> Result<OrgUnitRecord, SourceError> {
        let external_id = scalar_to_string(&self.id)
            .ok_or_else(|| SourceError::malformed(format!("record id {} is not a scalar", self.id)))?;
        let parent = scalar_to_string(&self.parent_id);
        let mut record = OrgUnitRecord::new(
            &external_id,
            self.title.as_deref().unwrap_or_default(),
            normalize_parent(parent.as_deref()).as_deref(),
        );
        if let Some(link) = self.url_website.filter(|link| !link.trim().is_empty()) {
            record = record.with_metadata(LINK_FIELD, link.trim());
        }
        Ok(record)
    }
}

/// Ids arrive as strings or numbers; null means absent
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Rows from `{"results": [...]}` or a bare array
fn rows_from_document(document: Value) -> Result<Vec<DirectoryRow>, SourceError> {
    let rows = match document {
        Value::Array(rows) => rows,
        Value::Object(mut object) => match object.remove("results") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(SourceError::malformed(
                    "expected a 'results' array in the directory document",
                ));
            }
        },
        _ => {
            return Err(SourceError::malformed(
                "directory document must be an array or an object",
            ));
        }
    };
    rows.into_iter()
        .enumerate()
        .map(|(position, row)| {
            serde_json::from_value(row)
                .map_err(|e| SourceError::malformed(format!("record {position}: {e}")))
        })
        .collect()
}

fn records_from_document(document: Value) -> Result<Vec<OrgUnitRecord>, SourceError> {
    rows_from_document(document)?
        .into_iter()
        .map(DirectoryRow::into_record)
        .collect()
}

/// Directory export stored as a JSON file
pub struct JsonFileDirectory {
    path: PathBuf,
}

impl JsonFileDirectory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl DirectorySource for JsonFileDirectory {
    async fn fetch_units(&self) -> Result<Vec<OrgUnitRecord>, SourceError> {
        debug!("Reading directory export {}", self.path.display());
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SourceError::unavailable(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let document: Value = serde_json::from_str(&content)
            .map_err(|e| SourceError::malformed(format!("{}: {e}", self.path.display())))?;
        let records = records_from_document(document)?;
        info!("Read {} records from {}", records.len(), self.path.display());
        Ok(records)
    }
}

/// One page of the records API
#[derive(Debug, Deserialize)]
struct RecordsPage {
    #[serde(default)]
    total_count: Option<usize>,
    results: Vec<Value>,
}

/// Records API paged with `limit`/`offset`
pub struct OdsDirectory {
    client: Client,
    url: String,
    page_size: usize,
}

impl OdsDirectory {
    pub fn new(url: &str, page_size: usize, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
            page_size: page_size.max(1),
        })
    }

    async fn fetch_page(&self, offset: usize) -> Result<RecordsPage, SourceError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("limit", self.page_size), ("offset", offset)])
            .send()
            .await
            .map_err(|e| SourceError::unavailable(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::unavailable(format!(
                "{} returned HTTP {status}: {body}",
                self.url
            )));
        }
        response
            .json::<RecordsPage>()
            .await
            .map_err(|e| SourceError::malformed(format!("{}: {e}", self.url)))
    }
}

#[async_trait]
impl DirectorySource for OdsDirectory {
    async fn fetch_units(&self) -> Result<Vec<OrgUnitRecord>, SourceError> {
        let mut rows = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.fetch_page(offset).await?;
            let received = page.results.len();
            debug!("Fetched {received} records at offset {offset}");
            rows.extend(page.results);
            offset += received;

            let exhausted = match page.total_count {
                Some(total) => offset >= total,
                None => received < self.page_size,
            };
            if received == 0 || exhausted {
                break;
            }
        }

        let records = records_from_document(Value::Array(rows))?;
        info!("Fetched {} records from {}", records.len(), self.url);
        Ok(records)
    }
}

/// Source wrapper that drops links whose page does not answer with a success
/// status, so the catalog never receives a dead link
pub struct LinkCheckingDirectory {
    inner: Arc<dyn DirectorySource>,
    client: Client,
    max_concurrency: usize,
}

impl LinkCheckingDirectory {
    pub fn new(
        inner: Arc<dyn DirectorySource>,
        timeout: Duration,
        max_concurrency: usize,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            inner,
            client,
            max_concurrency: max_concurrency.max(1),
        })
    }
}

async fn link_answers(client: &Client, link: &str) -> bool {
    match client.get(link).send().await {
        Ok(response) => response.status().is_success(),
        Err(err) => {
            debug!("Link {link} unreachable: {err}");
            false
        }
    }
}

#[async_trait]
impl DirectorySource for LinkCheckingDirectory {
    async fn fetch_units(&self) -> Result<Vec<OrgUnitRecord>, SourceError> {
        let mut records = self.inner.fetch_units().await?;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut checks = JoinSet::new();
        for (position, record) in records.iter().enumerate() {
            let Some(link) = record.metadata.get(LINK_FIELD).cloned() else {
                continue;
            };
            let client = self.client.clone();
            let semaphore = Arc::clone(&semaphore);
            checks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (position, link_answers(&client, &link).await)
            });
        }

        let mut dropped = 0;
        while let Some(joined) = checks.join_next().await {
            let (position, answered) = match joined {
                Ok(result) => result,
                Err(err) => {
                    warn!("Link check task failed: {err}");
                    continue;
                }
            };
            if !answered {
                let record = &mut records[position];
                if let Some(link) = record.metadata.remove(LINK_FIELD) {
                    warn!("Dropping invalid link for '{}': {link}", record.title);
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            info!("Dropped {dropped} links that did not answer");
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_ids_and_missing_parents() {
        let records = records_from_document(json!({
            "results": [
                {"id": 1, "title": "Council", "parent_id": null},
                {"id": "2", "title": "Finance", "parent_id": 1, "url_website": "https://dir.example/2"},
                {"id": 3, "title": "Archive", "parent_id": "nan"}
            ]
        }))
        .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].external_id, "1");
        assert!(records[0].parent_external_id.is_none());
        assert_eq!(records[1].parent_external_id.as_deref(), Some("1"));
        assert_eq!(
            records[1].metadata.get(LINK_FIELD).map(String::as_str),
            Some("https://dir.example/2")
        );
        assert!(records[2].parent_external_id.is_none());
    }

    #[test]
    fn test_bare_array_accepted() {
        let records = records_from_document(json!([{"id": "A", "title": "Alpha"}])).unwrap();
        assert_eq!(records[0].title, "Alpha");
    }

    #[test]
    fn test_unusable_documents_are_malformed() {
        assert!(matches!(
            records_from_document(json!({"rows": []})),
            Err(SourceError::Malformed { .. })
        ));
        assert!(matches!(
            records_from_document(json!([{"id": {"nested": true}, "title": "X"}])),
            Err(SourceError::Malformed { .. })
        ));
        assert!(records_from_document(json!("text")).is_err());
    }

    #[tokio::test]
    async fn test_missing_export_is_unavailable() {
        let source = JsonFileDirectory::new(PathBuf::from("/nonexistent/org_units.json"));
        assert!(matches!(
            source.fetch_units().await,
            Err(SourceError::Unavailable { .. })
        ));
    }
}
