//! Segmentation store interface
//!
//! The pipeline needs exactly one capability from storage: upsert a record keyed
//! by `(subject_id, category, name)` and say whether it was inserted or updated.
//! Implementations must be safe to call concurrently from every worker.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::record::{Record, UpsertOutcome};

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::{DatabaseConfig, PostgresStore};

/// Failures reported by a store for a single upsert
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("subject id {0} exceeds the store's id range")]
    SubjectIdOutOfRange(u64),

    #[error("payload rejected: {0}")]
    Payload(#[from] serde_json::Error),

    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait SegmentationStore: Send + Sync {
    /// Insert the record, or overwrite the payload of the existing entry with the same key
    async fn upsert(&self, record: &Record) -> Result<UpsertOutcome, StoreError>;
}

#[async_trait]
impl<S: SegmentationStore + ?Sized> SegmentationStore for std::sync::Arc<S> {
    async fn upsert(&self, record: &Record) -> Result<UpsertOutcome, StoreError> {
        (**self).upsert(record).await
    }
}

/// A segmentation as held by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredSegmentation {
    pub subject_id: u64,
    pub category: String,
    pub name: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
