//! Network and file collaborators of a sync pass

mod catalog;
mod directory;

pub use catalog::{RestCatalog, RestCatalogSettings};
pub use directory::{JsonFileDirectory, LinkCheckingDirectory, OdsDirectory};

use crate::config::{AppConfig, DirectoryKind};
use anyhow::{Context, Result};
use orgsync_core::{CatalogClient, DirectorySource};
use std::sync::Arc;
use std::time::Duration;

/// Directory source selected by the configuration
pub fn directory_from_config(config: &AppConfig) -> Result<Arc<dyn DirectorySource>> {
    let directory = &config.directory;
    let source: Arc<dyn DirectorySource> = match directory.kind {
        DirectoryKind::JsonFile => Arc::new(JsonFileDirectory::new(directory.path.clone())),
        DirectoryKind::Ods => Arc::new(
            OdsDirectory::new(
                &directory.url,
                directory.page_size,
                Duration::from_secs(directory.timeout_seconds),
            )
            .context("Failed to set up the directory client")?,
        ),
    };

    if !directory.link_check_enabled {
        return Ok(source);
    }
    let checked = LinkCheckingDirectory::new(
        source,
        Duration::from_secs(directory.timeout_seconds),
        directory.link_check_concurrency,
    )
    .context("Failed to set up the link checker")?;
    Ok(Arc::new(checked))
}

/// Catalog client for the configured endpoint; the token is read from the
/// environment variable named in the configuration
pub fn catalog_from_config(config: &AppConfig) -> Result<Arc<dyn CatalogClient>> {
    let catalog = &config.catalog;
    let token = std::env::var(&catalog.token_env)
        .ok()
        .filter(|token| !token.trim().is_empty());
    if token.is_none() {
        log::debug!("{} is not set, calling the catalog anonymously", catalog.token_env);
    }

    let settings = RestCatalogSettings {
        base_url: catalog.base_url.clone(),
        database: catalog.database.clone(),
        scheme: catalog.scheme.clone(),
        id_field_name: config.mapping.id_field_name.clone(),
        token,
        timeout: Duration::from_secs(catalog.timeout_seconds),
        connect_timeout: Duration::from_secs(catalog.connect_timeout_seconds),
    };
    let client = RestCatalog::new(settings).context("Failed to set up the catalog client")?;
    Ok(Arc::new(client))
}
