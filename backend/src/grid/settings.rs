//! Per-grid user preferences and their persistence.
//!
//! Settings are stored as JSON under `valyanmed.grid.<gridId>`. Persistent
//! storage is tried first; an in-memory cache keeps the last known settings
//! so a grid still opens with them when storage is unavailable or holds
//! corrupt data.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::paging::{SortDirection, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Key prefix shared by every grid.
pub const SETTINGS_KEY_PREFIX: &str = "valyanmed.grid.";

pub fn settings_key(grid_id: &str) -> String {
    format!("{}{}", SETTINGS_KEY_PREFIX, grid_id)
}

/// Column layout, ordering and paging preferences of one grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridSettings {
    /// Shown columns; empty means all.
    pub visible_columns: Vec<String>,
    pub column_order: Vec<String>,
    pub group_by: Option<String>,
    pub sort_column: Option<String>,
    pub sort_direction: SortDirection,
    pub page_size: i64,
    /// Saved filter values keyed by column.
    pub filters: BTreeMap<String, String>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            visible_columns: Vec::new(),
            column_order: Vec::new(),
            group_by: None,
            sort_column: None,
            sort_direction: SortDirection::Asc,
            page_size: DEFAULT_PAGE_SIZE,
            filters: BTreeMap::new(),
        }
    }
}

impl GridSettings {
    /// Page size forced into the accepted range.
    pub fn normalized(mut self) -> Self {
        if self.page_size <= 0 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self.page_size = self.page_size.min(MAX_PAGE_SIZE);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Settings storage is unavailable: {0}")]
    Unavailable(String),
    #[error("Settings storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// String key/value store holding serialized settings.
pub trait SettingsStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileSettingsStorage {
    dir: PathBuf,
}

impl FileSettingsStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl SettingsStorage for FileSettingsStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage; can be switched off to simulate an unavailable store.
#[derive(Debug, Default)]
pub struct MemorySettingsStorage {
    entries: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemorySettingsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage disabled".to_string()));
        }
        Ok(())
    }
}

impl SettingsStorage for MemorySettingsStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Loads and saves [`GridSettings`] with a memory fallback.
pub struct GridSettingsService {
    storage: Arc<dyn SettingsStorage>,
    cache: RwLock<HashMap<String, GridSettings>>,
}

impl GridSettingsService {
    pub fn new(storage: Arc<dyn SettingsStorage>) -> Self {
        Self {
            storage,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Settings for `grid_id`: storage, then cache, then defaults.
    pub fn load(&self, grid_id: &str) -> GridSettings {
        let key = settings_key(grid_id);
        match self.storage.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<GridSettings>(&raw) {
                Ok(settings) => {
                    let settings = settings.normalized();
                    self.cache.write().insert(key, settings.clone());
                    return settings;
                }
                Err(e) => log::warn!("Ignoring corrupt grid settings '{}': {}", key, e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read grid settings '{}': {}", key, e),
        }

        self.cache.read().get(&key).cloned().unwrap_or_default()
    }

    /// Save settings. Returns whether they reached persistent storage; the
    /// cache is updated either way.
    pub fn save(&self, grid_id: &str, settings: &GridSettings) -> bool {
        let key = settings_key(grid_id);
        let settings = settings.clone().normalized();

        let persisted = match serde_json::to_string(&settings) {
            Ok(raw) => match self.storage.set(&key, &raw) {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Grid settings '{}' kept in memory only: {}", key, e);
                    false
                }
            },
            Err(e) => {
                log::error!("Could not serialize grid settings '{}': {}", key, e);
                false
            }
        };

        self.cache.write().insert(key, settings);
        persisted
    }

    /// Forget the settings in storage and cache.
    pub fn reset(&self, grid_id: &str) {
        let key = settings_key(grid_id);
        if let Err(e) = self.storage.remove(&key) {
            log::warn!("Could not remove grid settings '{}': {}", key, e);
        }
        self.cache.write().remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GridSettings {
        GridSettings {
            visible_columns: vec!["lastName".to_string(), "cnp".to_string()],
            sort_column: Some("lastName".to_string()),
            sort_direction: SortDirection::Desc,
            page_size: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_save_and_load_from_storage() {
        let storage = Arc::new(MemorySettingsStorage::new());
        let service = GridSettingsService::new(storage.clone());
        assert!(service.save("patients", &sample()));
        assert!(storage.get("valyanmed.grid.patients").unwrap().is_some());

        // a fresh service (empty cache) reads storage
        let other = GridSettingsService::new(storage);
        assert_eq!(other.load("patients"), sample());
    }

    #[test]
    fn test_falls_back_to_cache_when_storage_fails() {
        let storage = Arc::new(MemorySettingsStorage::new());
        let service = GridSettingsService::new(storage.clone());
        storage.set_unavailable(true);

        assert!(!service.save("patients", &sample()));
        assert_eq!(service.load("patients"), sample());
        assert_eq!(service.load("devices"), GridSettings::default());
    }

    #[test]
    fn test_corrupt_storage_uses_cache() {
        let storage = Arc::new(MemorySettingsStorage::new());
        let service = GridSettingsService::new(storage.clone());
        service.save("staff", &sample());
        storage.set("valyanmed.grid.staff", "{not json").unwrap();

        assert_eq!(service.load("staff"), sample());
    }

    #[test]
    fn test_reset_clears_both() {
        let storage = Arc::new(MemorySettingsStorage::new());
        let service = GridSettingsService::new(storage.clone());
        service.save("partners", &sample());
        service.reset("partners");

        assert!(storage.get("valyanmed.grid.partners").unwrap().is_none());
        assert_eq!(service.load("partners"), GridSettings::default());
    }

    #[test]
    fn test_page_size_is_normalized() {
        let storage = Arc::new(MemorySettingsStorage::new());
        let service = GridSettingsService::new(storage);
        let settings = GridSettings {
            page_size: 1_000,
            ..Default::default()
        };
        service.save("medications", &settings);
        assert_eq!(service.load("medications").page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSettingsStorage::new(dir.path().join("grids"));
        assert!(storage.get("valyanmed.grid.patients").unwrap().is_none());

        storage.set("valyanmed.grid.patients", "{}").unwrap();
        assert!(dir.path().join("grids/valyanmed.grid.patients.json").exists());
        assert_eq!(storage.get("valyanmed.grid.patients").unwrap().as_deref(), Some("{}"));

        storage.remove("valyanmed.grid.patients").unwrap();
        storage.remove("valyanmed.grid.patients").unwrap();
        assert!(storage.get("valyanmed.grid.patients").unwrap().is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: GridSettings = serde_json::from_str(r#"{"groupBy":"city"}"#).unwrap();
        assert_eq!(settings.group_by.as_deref(), Some("city"));
        assert_eq!(settings.page_size, DEFAULT_PAGE_SIZE);
    }
}
