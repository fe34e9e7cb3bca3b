//! Error types for the progression engine.
//!
//! Precondition violations (completing a quest twice, undoing nothing,
//! starting an active challenge) are not errors; they come back as outcome
//! enums from the engine. Only storage, config and corrupt-document failures
//! end up here.

use thiserror::Error;

/// Failures raised by a key-value backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage quota exceeded: {needed} bytes needed, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Storage is full. {guidance}")]
    StorageFull { guidance: String },

    #[error("Saved profile is corrupt: {0}")]
    CorruptDocument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn code(&self) -> i32 {
        match self {
            EngineError::Storage(_) => -32010,
            EngineError::StorageFull { .. } => -32011,
            EngineError::CorruptDocument(_) => -32012,
            EngineError::Json(_) => -32700,
            EngineError::Config(_) => -32013,
            EngineError::Io(_) => -32006,
        }
    }

    /// True when the caller should offer a reset to defaults.
    pub fn is_corruption(&self) -> bool {
        matches!(self, EngineError::CorruptDocument(_))
    }
}
