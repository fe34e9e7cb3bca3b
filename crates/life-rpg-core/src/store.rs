//! Key-value persistence backends.
//!
//! The engine stores the whole profile as one string under one key, plus an
//! optional pre-migration backup under a second key.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StoreError;

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

fn check_quota(quota: Option<u64>, others: u64, incoming: u64) -> Result<(), StoreError> {
    match quota {
        Some(limit) if others + incoming > limit => Err(StoreError::QuotaExceeded {
            needed: incoming,
            available: limit.saturating_sub(others),
        }),
        _ => Ok(()),
    }
}

/// Write via a temp file in the same directory, then rename over the target.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// One `<key>.json` file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), quota: None }
    }

    /// Cap the combined size of all keys, in bytes.
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid storage key: {:?}", key),
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Bytes used by every key except `key`.
    fn used_by_others(&self, key: &str) -> Result<u64, StoreError> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let own = format!("{}.json", key);
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(".json") && name != own {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if self.quota.is_some() {
            check_quota(self.quota, self.used_by_others(key)?, value.len() as u64)?;
        }
        atomic_write(&path, value.as_bytes())?;
        debug!(key, bytes = value.len(), "stored");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn used_bytes(&self) -> u64 {
        self.entries.values().map(|v| v.len() as u64).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let others = self.used_bytes() - self.entries.get(key).map_or(0, |v| v.len() as u64);
        check_quota(self.quota, others, value.len() as u64)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path().join("data"));
        assert_eq!(store.get("lifeRPGData").unwrap(), None);

        store.set("lifeRPGData", "{\"version\":3}").unwrap();
        assert_eq!(store.get("lifeRPGData").unwrap().as_deref(), Some("{\"version\":3}"));
        assert!(!dir.path().join("data").join("lifeRPGData.tmp").exists());

        store.remove("lifeRPGData").unwrap();
        store.remove("lifeRPGData").unwrap();
        assert_eq!(store.get("lifeRPGData").unwrap(), None);
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path());
        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
    }

    #[test]
    fn test_file_store_quota_counts_other_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = FileStore::new(dir.path()).with_quota(10);
        store.set("a", "123456").unwrap();
        // Overwriting the same key does not count its old size.
        store.set("a", "1234567").unwrap();
        let err = store.set("b", "12345").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { needed: 5, available: 3 }));
        store.remove("a").unwrap();
        store.set("b", "12345").unwrap();
    }

    #[test]
    fn test_memory_store_quota() {
        let mut store = MemoryStore::new().with_quota(8);
        store.set("doc", "12345").unwrap();
        assert!(store.set("backup", "12345").is_err());
        store.remove("doc").unwrap();
        store.set("backup", "12345").unwrap();
        assert!(store.contains("backup"));
        assert_eq!(store.used_bytes(), 5);
    }
}
