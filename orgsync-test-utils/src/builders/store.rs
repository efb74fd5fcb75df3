use orgsync_core::{MappingStore, MappingStoreConfig};
use std::path::Path;
use tempfile::TempDir;

/// Mapping store configuration rooted at `directory`
pub fn store_config(directory: &Path) -> MappingStoreConfig {
    MappingStoreConfig {
        directory: directory.to_path_buf(),
        database_name: "catalog".to_string(),
        scheme: "public".to_string(),
        file_prefix: "orgunits".to_string(),
        id_field_name: "external_id".to_string(),
    }
}

/// Temporary directory that mapping stores can be opened in.
/// The directory is removed when this value is dropped.
pub struct ScratchStore {
    dir: TempDir,
}

impl ScratchStore {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> MappingStoreConfig {
        store_config(self.dir.path())
    }

    /// Open and load the store. Only one may be open at a time.
    pub fn open(&self) -> MappingStore {
        let mut store = MappingStore::open(self.config()).unwrap();
        store.load().unwrap();
        store
    }
}

impl Default for ScratchStore {
    fn default() -> Self {
        Self::new()
    }
}
