//! Engine configuration.
//!
//! Optional TOML file; every field has a default, so an empty file is valid.
//!
//! ```toml
//! [storage]
//! data_dir = "/home/me/.local/share/life-rpg"
//! quota_bytes = 5242880
//!
//! [migration]
//! backup_before_migration = true
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::EngineError;
use crate::store::FileStore;

pub const DEFAULT_STORAGE_KEY: &str = "lifeRPGData";
pub const DEFAULT_BACKUP_KEY: &str = "lifeRPGData_backup";

const MIN_QUOTA_BYTES: u64 = 64 * 1024;
const MAX_QUOTA_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Where the pre-migration copy goes. Dropped first when space runs out.
    #[serde(default = "default_backup_key")]
    pub backup_key: String,

    /// Total bytes the store may use (valid: 64 KiB - 512 MiB)
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("life-rpg")
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_backup_key() -> String {
    DEFAULT_BACKUP_KEY.to_string()
}

fn default_quota_bytes() -> u64 {
    5 * 1024 * 1024
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_key: default_storage_key(),
            backup_key: default_backup_key(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

impl StorageSettings {
    pub fn effective_quota_bytes(&self) -> u64 {
        self.quota_bytes.clamp(MIN_QUOTA_BYTES, MAX_QUOTA_BYTES)
    }

    pub fn quota_was_clamped(&self) -> bool {
        self.quota_bytes != self.effective_quota_bytes()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSettings {
    #[serde(default = "default_backup_before_migration")]
    pub backup_before_migration: bool,
}

fn default_backup_before_migration() -> bool {
    true
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            backup_before_migration: default_backup_before_migration(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub migration: MigrationSettings,
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, EngineError> {
        toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Defaults when the file is missing; defaults plus a warning when it is
    /// unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid config");
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// File store rooted at `data_dir` with the clamped quota.
    pub fn file_store(&self) -> FileStore {
        if self.storage.quota_was_clamped() {
            warn!(
                requested = self.storage.quota_bytes,
                effective = self.storage.effective_quota_bytes(),
                "storage quota clamped"
            );
        }
        FileStore::new(&self.storage.data_dir).with_quota(self.storage.effective_quota_bytes())
    }
}
