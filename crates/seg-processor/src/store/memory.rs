//! In-process segmentation store
//!
//! Used for dry runs and tests. Entries live in an ordered map so lookups by
//! subject come back sorted by category and name.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{btree_map::Entry, BTreeMap};
use std::sync::Mutex;

use super::{SegmentationStore, StoreError, StoredSegmentation};
use crate::record::{Record, SegmentationKey, UpsertOutcome};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<SegmentationKey, StoredSegmentation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &SegmentationKey) -> Option<StoredSegmentation> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    /// All segmentations of one subject, ordered by category then name
    pub fn find_by_subject(&self, subject_id: u64) -> Vec<StoredSegmentation> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        let from = SegmentationKey {
            subject_id,
            category: String::new(),
            name: String::new(),
        };
        entries
            .range(from..)
            .take_while(|(key, _)| key.subject_id == subject_id)
            .map(|(_, stored)| stored.clone())
            .collect()
    }
}

#[async_trait]
impl SegmentationStore for MemoryStore {
    async fn upsert(&self, record: &Record) -> Result<UpsertOutcome, StoreError> {
        let payload: serde_json::Value = serde_json::from_slice(record.payload())?;
        let now = Utc::now();

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;

        match entries.entry(record.key()) {
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.payload = payload;
                existing.updated_at = now;
                Ok(UpsertOutcome::Updated)
            }
            Entry::Vacant(slot) => {
                slot.insert(StoredSegmentation {
                    subject_id: record.subject_id(),
                    category: record.category().to_string(),
                    name: record.name().to_string(),
                    payload,
                    created_at: now,
                    updated_at: now,
                });
                Ok(UpsertOutcome::Inserted)
            }
        }
    }
}
