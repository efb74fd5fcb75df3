use super::record::{MappingEntry, MappingRecord};
use crate::error::{MappingIntegrityError, Result, StoreError, ValidationError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Where the mapping file lives and how its id column is named
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingStoreConfig {
    pub directory: PathBuf,
    pub database_name: String,
    pub scheme: String,
    pub file_prefix: String,
    pub id_field_name: String,
}

impl MappingStoreConfig {
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}-mapping.csv",
            self.database_name, self.scheme, self.file_prefix
        )
    }

    pub fn file_path(&self) -> PathBuf {
        self.directory.join(self.file_name())
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        for (name, value) in [
            ("database_name", &self.database_name),
            ("scheme", &self.scheme),
            ("file_prefix", &self.file_prefix),
            ("id_field_name", &self.id_field_name),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::missing_field(name));
            }
        }
        Ok(())
    }
}

/// Lock file held next to the mapping file for the lifetime of a store
#[derive(Debug)]
struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    fn acquire(path: PathBuf) -> std::result::Result<Self, StoreError> {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", std::process::id()) {
                    warn!("Could not record pid in lock file {}: {e}", path.display());
                }
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::locked(&path))
            }
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to release lock {}: {e}", self.path.display());
        }
    }
}

/// Durable external id to catalog unit mapping, exclusively held while open
#[derive(Debug)]
pub struct MappingStore<R: MappingRecord = MappingEntry> {
    config: MappingStoreConfig,
    path: PathBuf,
    entries: BTreeMap<String, R>,
    _lock: StoreLock,
}

impl<R: MappingRecord> MappingStore<R> {
    /// Open the store and take its lock. Entries are not read until [`Self::load`].
    pub fn open(config: MappingStoreConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.directory)
            .map_err(|e| StoreError::io(&config.directory, e))?;

        let path = config.file_path();
        let lock = StoreLock::acquire(lock_path(&path))?;
        debug!("Opened mapping store {}", path.display());

        Ok(Self {
            config,
            path,
            entries: BTreeMap::new(),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &MappingStoreConfig {
        &self.config
    }

    /// Replace in-memory entries with the file contents. A missing file is an empty mapping.
    pub fn load(&mut self) -> Result<usize> {
        self.entries.clear();
        if !self.path.exists() {
            info!(
                "No mapping file at {}, starting empty",
                self.path.display()
            );
            return Ok(0);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .map_err(|e| StoreError::csv(&self.path, e))?;

        let headers = reader
            .headers()
            .map_err(|e| StoreError::csv(&self.path, e))?
            .clone();
        let id_index = self.column_index(&headers, &self.config.id_field_name)?;
        let column_indices = R::COLUMNS
            .iter()
            .map(|column| self.column_index(&headers, column))
            .collect::<Result<Vec<_>>>()?;

        for row in reader.records() {
            let row = row.map_err(|e| StoreError::csv(&self.path, e))?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();

            let external_id = row.get(id_index).unwrap_or_default().trim();
            if external_id.is_empty() {
                return Err(StoreError::MalformedRow {
                    line,
                    reason: format!("empty '{}'", self.config.id_field_name),
                }
                .into());
            }

            let columns: Vec<&str> = column_indices
                .iter()
                .map(|&idx| row.get(idx).unwrap_or_default())
                .collect();
            let record = R::from_columns(external_id, &columns)
                .map_err(|reason| StoreError::MalformedRow { line, reason })?;
            validate_target_id(&record)?;

            if self.entries.insert(external_id.to_string(), record).is_some() {
                return Err(MappingIntegrityError::DuplicateMappingEntry {
                    external_id: external_id.to_string(),
                }
                .into());
            }
        }

        info!(
            "Loaded {} mapping entries from {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(self.entries.len())
    }

    fn column_index(&self, headers: &csv::StringRecord, column: &str) -> Result<usize> {
        headers
            .iter()
            .position(|header| header.trim() == column)
            .ok_or_else(|| {
                StoreError::MissingColumn {
                    path: self.path.clone(),
                    column: column.to_string(),
                }
                .into()
            })
    }

    pub fn get(&self, external_id: &str) -> Option<&R> {
        self.entries.get(external_id)
    }

    pub fn find_by_target_id(&self, target_id: &str) -> Option<&R> {
        self.entries
            .values()
            .find(|record| record.target_id() == target_id)
    }

    /// Insert or replace an entry, returning the previous one
    pub fn upsert(&mut self, record: R) -> Result<Option<R>> {
        validate_target_id(&record)?;
        Ok(self
            .entries
            .insert(record.external_id().to_string(), record))
    }

    pub fn remove(&mut self, external_id: &str) -> Option<R> {
        self.entries.remove(external_id)
    }

    /// Entries sorted by external id
    pub fn entries(&self) -> impl Iterator<Item = &R> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the whole file through a temporary file renamed into place
    pub fn save(&self) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.config.directory)
            .map_err(|e| StoreError::io(&self.config.directory, e))?;

        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            let mut header = Vec::with_capacity(R::COLUMNS.len() + 1);
            header.push(self.config.id_field_name.as_str());
            header.extend_from_slice(R::COLUMNS);
            writer
                .write_record(&header)
                .map_err(|e| StoreError::csv(&self.path, e))?;

            for (external_id, record) in &self.entries {
                let mut row = Vec::with_capacity(header.len());
                row.push(external_id.clone());
                row.extend(record.to_columns());
                writer
                    .write_record(&row)
                    .map_err(|e| StoreError::csv(&self.path, e))?;
            }
            writer.flush().map_err(|e| StoreError::io(&self.path, e))?;
        }

        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        info!(
            "Saved {} mapping entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

fn validate_target_id<R: MappingRecord>(record: &R) -> Result<()> {
    if Uuid::parse_str(record.target_id()).is_err() {
        return Err(StoreError::invalid_target_id(record.external_id(), record.target_id()).into());
    }
    Ok(())
}
