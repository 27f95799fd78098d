//! Durable tier of the detection cache.

use crate::error::StoreError;
use crate::models::DetectionReport;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A report as persisted, with the metadata needed to rebuild a cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: String,
    pub path: String,
    pub context: String,
    pub created_at: DateTime<Utc>,
    pub report: DetectionReport,
}

/// Cross-restart key-value storage for detection reports.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<StoredEntry>, StoreError>;

    fn set(
        &self,
        key: &str,
        path: &str,
        context_label: &str,
        report: &DetectionReport,
    ) -> Result<(), StoreError>;

    /// Remove one key, or everything when `key` is `None`.
    fn clear(&self, key: Option<&str>) -> Result<(), StoreError>;

    fn list_keys(&self) -> Result<Vec<String>, StoreError>;
}

fn stored_entry(
    key: &str,
    path: &str,
    context_label: &str,
    report: &DetectionReport,
) -> StoredEntry {
    StoredEntry {
        key: key.to_string(),
        path: path.to_string(),
        context: context_label.to_string(),
        created_at: Utc::now(),
        report: report.clone(),
    }
}

/// One JSON file per key: `<dir>/<base64url(key)>.json`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", URL_SAFE_NO_PAD.encode(key.as_bytes())))
    }

    fn key_from_file(path: &Path) -> Option<String> {
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let bytes = URL_SAFE_NO_PAD.decode(stem).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Write to a temp file in the same dir, then rename over the target.
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(data)?;
        tmp.flush()?;
        tmp.persist(path)?;
        Ok(())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<StoredEntry>, StoreError> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: StoredEntry = serde_json::from_str(&content)?;
        Ok(Some(entry))
    }

    fn set(
        &self,
        key: &str,
        path: &str,
        context_label: &str,
        report: &DetectionReport,
    ) -> Result<(), StoreError> {
        let entry = stored_entry(key, path, context_label, report);
        let data = serde_json::to_vec_pretty(&entry)?;
        self.write_atomic(&self.entry_path(key), &data)
    }

    fn clear(&self, key: Option<&str>) -> Result<(), StoreError> {
        let targets = match key {
            Some(key) => vec![self.entry_path(key)],
            None => match fs::read_dir(&self.dir) {
                Ok(entries) => entries
                    .flatten()
                    .map(|e| e.path())
                    .filter(|p| Self::key_from_file(p).is_some())
                    .collect(),
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e.into()),
            },
        };

        for target in targets {
            match fs::remove_file(&target) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys: Vec<String> = entries
            .flatten()
            .filter_map(|e| Self::key_from_file(&e.path()))
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Process-local store, for tests and for running without persistence.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoredEntry>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(
        &self,
        key: &str,
        path: &str,
        context_label: &str,
        report: &DetectionReport,
    ) -> Result<(), StoreError> {
        self.entries().insert(
            key.to_string(),
            stored_entry(key, path, context_label, report),
        );
        Ok(())
    }

    fn clear(&self, key: Option<&str>) -> Result<(), StoreError> {
        let mut entries = self.entries();
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.entries().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
