use crate::output::ReportFormat;
use crate::paths;
use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use orgsync_core::{
    CompareStrategy, MappingStoreConfig, PathEscaping, RetryPolicy, UpdaterConfig,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub mapping: MappingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Where organizational records come from
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryKind {
    JsonFile,
    Ods,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DirectoryConfig {
    pub kind: DirectoryKind,
    /// Export file read by the `json_file` source
    pub path: PathBuf,
    /// Records endpoint queried by the `ods` source
    pub url: String,
    pub page_size: usize,
    pub timeout_seconds: u64,
    /// Request every record's link and drop the ones that fail
    pub link_check_enabled: bool,
    pub link_check_concurrency: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: String,
    pub database: String,
    pub scheme: String,
    /// Environment variable holding the bearer token
    pub token_env: String,
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SyncConfig {
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub retry_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// 0 disables the pass timeout
    pub pass_timeout_seconds: u64,
    pub tracked_fields: Vec<String>,
    pub path_escaping: PathEscaping,
    pub allow_empty_source: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MappingConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
    pub id_field_name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub default_format: ReportFormat,
    pub color_enabled: bool,
    pub report_enabled: bool,
    pub report_dir: PathBuf,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            kind: DirectoryKind::JsonFile,
            path: PathBuf::from("org_units.json"),
            url: String::new(),
            page_size: 100,
            timeout_seconds: 30,
            link_check_enabled: false,
            link_check_concurrency: 8,
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            database: "catalog".to_string(),
            scheme: "organization".to_string(),
            token_env: "ORGSYNC_CATALOG_TOKEN".to_string(),
            timeout_seconds: 60,
            connect_timeout_seconds: 10,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            batch_size: 50,
            max_concurrency: 4,
            retry_attempts: retry.max_attempts,
            retry_initial_delay_ms: retry.initial_delay.as_millis() as u64,
            retry_max_delay_ms: retry.max_delay.as_millis() as u64,
            pass_timeout_seconds: 0,
            tracked_fields: CompareStrategy::default().tracked_fields,
            path_escaping: PathEscaping::default(),
            allow_empty_source: false,
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            directory: paths::get_mapping_dir(),
            file_prefix: "orgunits".to_string(),
            id_field_name: "external_id".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: ReportFormat::Human,
            color_enabled: true,
            report_enabled: true,
            report_dir: paths::get_report_dir(),
        }
    }
}

impl AppConfig {
    pub fn updater_config(&self) -> UpdaterConfig {
        UpdaterConfig {
            batch_size: self.sync.batch_size,
            max_concurrency: self.sync.max_concurrency,
            retry: RetryPolicy::new(self.sync.retry_attempts)
                .with_initial_delay(Duration::from_millis(self.sync.retry_initial_delay_ms))
                .with_max_delay(Duration::from_millis(self.sync.retry_max_delay_ms)),
            escaping: self.sync.path_escaping,
        }
    }

    pub fn compare_strategy(&self) -> CompareStrategy {
        CompareStrategy::new(self.sync.tracked_fields.iter().map(String::as_str))
    }

    /// Mapping file location; database and scheme come from the catalog section
    pub fn store_config(&self) -> MappingStoreConfig {
        MappingStoreConfig {
            directory: self.mapping.directory.clone(),
            database_name: self.catalog.database.clone(),
            scheme: self.catalog.scheme.clone(),
            file_prefix: self.mapping.file_prefix.clone(),
            id_field_name: self.mapping.id_field_name.clone(),
        }
    }

    pub fn pass_timeout(&self) -> Option<Duration> {
        (self.sync.pass_timeout_seconds > 0)
            .then(|| Duration::from_secs(self.sync.pass_timeout_seconds))
    }
}

/// Configuration manager that handles XDG-compliant paths and layered configuration
pub struct ConfigManager {
    config_path: PathBuf,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    /// Create a new ConfigManager with default XDG-compliant paths
    pub fn new() -> Self {
        Self {
            config_path: paths::get_config_dir().join("config.toml"),
        }
    }

    /// Create a ConfigManager with a specific path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn get_config_path(&self) -> PathBuf {
        self.config_path.clone()
    }

    /// Load configuration with layered priority: ENV > File > Defaults
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed("ORGSYNC_").split("__"));

        figment.extract().context("Failed to load configuration")
    }

    /// Get a configuration value by key (dot notation)
    pub fn get(&self, key: &str) -> Result<String> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        let value: toml::Value = toml::from_str(&toml_string)?;

        let mut current = &value;
        for part in key.split('.') {
            match current {
                toml::Value::Table(table) => {
                    current = table
                        .get(part)
                        .ok_or_else(|| anyhow::anyhow!("Key '{}' not found", key))?;
                }
                _ => anyhow::bail!("Invalid key path: {}", key),
            }
        }

        render_value(current).ok_or_else(|| anyhow::anyhow!("Value at '{}' is not a simple type", key))
    }

    /// Set a configuration value by key (dot notation) in the config file
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed_value = parse_config_value(key, value)?;

        let mut config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        let parts: Vec<&str> = key.split('.').collect();
        let Some((last, sections)) = parts.split_last() else {
            anyhow::bail!("Empty key");
        };

        let mut current = &mut config;
        for part in sections {
            let toml::Value::Table(table) = current else {
                anyhow::bail!("Invalid key path: expected table at '{}'", part);
            };
            current = table
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        }
        let toml::Value::Table(table) = current else {
            anyhow::bail!("Cannot set value on non-table");
        };
        table.insert(last.to_string(), parsed_value);

        // The edited file must still produce a loadable configuration
        let candidate: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(&toml::to_string(&config)?))
            .extract()
            .with_context(|| format!("Invalid value for '{key}'"))?;
        validate(&candidate)?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config_path, toml::to_string_pretty(&config)?)?;

        Ok(())
    }

    /// List all configuration values
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let config = self.load()?;
        let toml_string = toml::to_string(&config)?;
        let value: toml::Value = toml::from_str(&toml_string)?;

        let mut items = Vec::new();
        collect_values(&value, String::new(), &mut items);
        items.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(items)
    }
}

/// Reject settings the pipeline cannot run with
pub fn validate(config: &AppConfig) -> Result<()> {
    config
        .updater_config()
        .validate()
        .context("Invalid sync settings")?;
    config
        .store_config()
        .validate()
        .context("Invalid mapping settings")?;
    reqwest::Url::parse(&config.catalog.base_url)
        .with_context(|| format!("catalog.base_url '{}' is not a URL", config.catalog.base_url))?;
    if config.directory.page_size == 0 {
        anyhow::bail!("directory.page_size must be greater than 0");
    }
    if config.directory.link_check_concurrency == 0 {
        anyhow::bail!("directory.link_check_concurrency must be greater than 0");
    }
    if config.directory.kind == DirectoryKind::Ods && config.directory.url.trim().is_empty() {
        anyhow::bail!("directory.url is required for the ods source");
    }
    Ok(())
}

/// Load the configuration from the default location
pub fn get_config() -> Result<AppConfig> {
    ConfigManager::new().load()
}

fn render_value(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Array(items) => {
            let rendered: Option<Vec<String>> = items.iter().map(render_value).collect();
            rendered.map(|items| items.join(","))
        }
        _ => None,
    }
}

fn collect_values(value: &toml::Value, prefix: String, items: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_values(val, new_prefix, items);
            }
        }
        other => {
            if let Some(rendered) = render_value(other) {
                items.push((prefix, rendered));
            }
        }
    }
}

/// Parse a value to the TOML type its key expects
fn parse_config_value(key: &str, value: &str) -> Result<toml::Value> {
    match key {
        "sync.tracked_fields" => Ok(toml::Value::Array(
            value
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(|field| toml::Value::String(field.to_string()))
                .collect(),
        )),
        k if k.ends_with("_size")
            || k.ends_with("_seconds")
            || k.ends_with("_ms")
            || k.ends_with("_attempts")
            || k.ends_with("_concurrency") =>
        {
            let num: u64 = value
                .parse()
                .with_context(|| format!("{key} must be a non-negative integer"))?;
            let num = i64::try_from(num).context("Value out of range")?;
            Ok(toml::Value::Integer(num))
        }
        k if k.ends_with("_enabled") || k == "sync.allow_empty_source" => {
            let flag: bool = value
                .parse()
                .context("Expected boolean value (true/false)")?;
            Ok(toml::Value::Boolean(flag))
        }
        _ => Ok(toml::Value::String(value.to_string())),
    }
}
