//! REST client for the catalog holding the mirrored hierarchy

use async_trait::async_trait;
use log::{debug, warn};
use orgsync_core::catalog::{CatalogClient, ItemResult, UnitPayload, UnitUpdate};
use orgsync_core::error::CatalogError;
use orgsync_core::{Metadata, TargetUnit, UnitRef};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::time::Duration;

/// Connection settings for [`RestCatalog`]
#[derive(Debug, Clone)]
pub struct RestCatalogSettings {
    pub base_url: String,
    pub database: String,
    pub scheme: String,
    /// Custom property carrying the directory id on each unit
    pub id_field_name: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

/// Asset as listed by the catalog
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Asset {
    id: String,
    #[serde(default)]
    href: Option<String>,
    label: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    custom_properties: Map<String, Value>,
}

/// Per-item answer of an upload
#[derive(Debug, Deserialize)]
struct UploadItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    status: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    results: Vec<UploadItem>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Wrapped { results: Vec<Asset> },
    Bare(Vec<Asset>),
}

pub struct RestCatalog {
    client: Client,
    settings: RestCatalogSettings,
}

impl RestCatalog {
    pub fn new(settings: RestCatalogSettings) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|e| CatalogError::other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, settings })
    }

    fn base(&self) -> &str {
        self.settings.base_url.trim_end_matches('/')
    }

    fn collections_url(&self) -> String {
        format!(
            "{}/api/{}/schemes/{}/collections",
            self.base(),
            self.settings.database,
            self.settings.scheme
        )
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/api/{}/schemes/{}/upload",
            self.base(),
            self.settings.database,
            self.settings.scheme
        )
    }

    fn unit_url(&self, target_id: &str) -> String {
        format!(
            "{}/rest/{}/collections/{}",
            self.base(),
            self.settings.database,
            target_id
        )
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(header::ACCEPT, "application/json");
        match &self.settings.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, operation: &str) -> Result<Response, CatalogError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| transport_error(e, operation))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!("{operation} returned HTTP {status}: {body}");
        Err(CatalogError::from_status(
            status.as_u16(),
            format!("{operation}: {}", body.trim()),
        ))
    }

    async fn upload(
        &self,
        assets: Vec<Value>,
        operation: &str,
    ) -> Result<Vec<ItemResult<UnitRef>>, CatalogError> {
        let expected = assets.len();
        let request = self
            .client
            .post(self.upload_url())
            .json(&json!({ "assets": assets }));
        let response: UploadResponse = self
            .send(request, operation)
            .await?
            .json()
            .await
            .map_err(|e| CatalogError::other(format!("{operation}: unreadable response: {e}")))?;

        if response.results.len() != expected {
            return Err(CatalogError::other(format!(
                "{operation}: expected {expected} results, got {}",
                response.results.len()
            )));
        }
        Ok(response
            .results
            .into_iter()
            .map(|item| self.item_result(item))
            .collect())
    }

    fn item_result(&self, item: UploadItem) -> ItemResult<UnitRef> {
        match item {
            UploadItem {
                id: Some(id),
                error: None,
                href,
                ..
            } => {
                let address = href.unwrap_or_else(|| self.unit_url(&id));
                Ok(UnitRef {
                    target_id: id,
                    address,
                })
            }
            UploadItem { error, status, .. } => {
                let message = error.unwrap_or_else(|| "item rejected".to_string());
                Err(match status {
                    Some(status) => CatalogError::from_status(status, message),
                    None => CatalogError::rejected(None, message),
                })
            }
        }
    }

    fn asset_body(&self, payload: &UnitPayload, target_id: Option<&str>) -> Value {
        let mut properties = Map::new();
        properties.insert(
            self.settings.id_field_name.clone(),
            Value::String(payload.external_id.clone()),
        );
        for (key, value) in &payload.metadata {
            properties.insert(key.clone(), Value::String(value.clone()));
        }

        let mut asset = json!({
            "_type": "Collection",
            "label": payload.title,
            "customProperties": properties,
        });
        if let Some(parent) = &payload.parent {
            asset["parentId"] = Value::String(parent.target_id.clone());
            asset["inCollection"] = Value::String(parent.path.clone());
        }
        if let Some(id) = target_id {
            asset["id"] = Value::String(id.to_string());
        }
        asset
    }

    fn to_target_units(&self, assets: Vec<Asset>) -> Vec<TargetUnit> {
        let by_id: HashMap<&str, &Asset> = assets.iter().map(|a| (a.id.as_str(), a)).collect();

        assets
            .iter()
            .map(|asset| {
                let parent_target_id = asset
                    .parent_id
                    .as_deref()
                    .filter(|parent| by_id.contains_key(parent))
                    .map(str::to_string);
                let (external_id, metadata) = self.split_properties(&asset.custom_properties);
                TargetUnit {
                    target_id: asset.id.clone(),
                    address: asset
                        .href
                        .clone()
                        .unwrap_or_else(|| self.unit_url(&asset.id)),
                    path: path_of(asset, &by_id),
                    title: asset.label.clone(),
                    parent_target_id,
                    external_id,
                    metadata,
                }
            })
            .collect()
    }

    fn split_properties(&self, properties: &Map<String, Value>) -> (Option<String>, Metadata) {
        let mut external_id = None;
        let mut metadata = Metadata::new();
        for (key, value) in properties {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => continue,
            };
            if *key == self.settings.id_field_name {
                external_id = Some(text);
            } else {
                metadata.insert(key.clone(), text);
            }
        }
        (external_id, metadata)
    }
}

/// Titles from the managed root down to `asset`; stops on a parent cycle
fn path_of(asset: &Asset, by_id: &HashMap<&str, &Asset>) -> Vec<String> {
    let mut path = vec![asset.label.clone()];
    let mut seen = HashSet::from([asset.id.as_str()]);
    let mut current = asset;

    while let Some(parent_id) = current.parent_id.as_deref()
        && let Some(&parent) = by_id.get(parent_id)
    {
        if !seen.insert(parent.id.as_str()) {
            warn!("Parent cycle in catalog listing at unit {}", parent.id);
            break;
        }
        path.push(parent.label.clone());
        current = parent;
    }
    path.reverse();
    path
}

fn transport_error(error: reqwest::Error, operation: &str) -> CatalogError {
    if error.is_timeout() {
        CatalogError::timeout(operation)
    } else if error.is_connect() || error.is_request() {
        CatalogError::transient(format!("{operation}: {error}"))
    } else {
        CatalogError::other(format!("{operation}: {error}"))
    }
}

#[async_trait]
impl CatalogClient for RestCatalog {
    async fn list_units(&self) -> Result<Vec<TargetUnit>, CatalogError> {
        let request = self.client.get(self.collections_url());
        let listing: Listing = self
            .send(request, "list_units")
            .await?
            .json()
            .await
            .map_err(|e| CatalogError::other(format!("list_units: unreadable listing: {e}")))?;
        let assets = match listing {
            Listing::Wrapped { results } => results,
            Listing::Bare(assets) => assets,
        };
        debug!("Catalog lists {} units", assets.len());
        Ok(self.to_target_units(assets))
    }

    async fn create_units(
        &self,
        batch: &[UnitPayload],
    ) -> Result<Vec<ItemResult<UnitRef>>, CatalogError> {
        let assets = batch
            .iter()
            .map(|payload| self.asset_body(payload, None))
            .collect();
        self.upload(assets, "create_units").await
    }

    async fn update_units(
        &self,
        batch: &[UnitUpdate],
    ) -> Result<Vec<ItemResult<UnitRef>>, CatalogError> {
        let assets = batch
            .iter()
            .map(|update| self.asset_body(&update.payload, Some(&update.target_id)))
            .collect();
        self.upload(assets, "update_units").await
    }

    async fn delete_units(
        &self,
        target_ids: &[String],
    ) -> Result<Vec<ItemResult<()>>, CatalogError> {
        let mut results = Vec::with_capacity(target_ids.len());
        for target_id in target_ids {
            let response = self
                .authorize(self.client.delete(self.unit_url(target_id)))
                .send()
                .await;
            let result = match response {
                Ok(response) if response.status().is_success() => Ok(()),
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    Err(CatalogError::not_found(target_id))
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    Err(CatalogError::from_status(
                        status,
                        format!("delete {target_id}: {}", body.trim()),
                    ))
                }
                Err(error) => Err(transport_error(error, "delete_units")),
            };
            results.push(result);
        }
        Ok(results)
    }
}
