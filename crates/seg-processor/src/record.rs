//! Core types for the segmentation pipeline

use serde::{Deserialize, Serialize};

/// One validated segmentation row, ready to be upserted
///
/// Uniqueness in the store is the `(subject_id, category, name)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    subject_id: u64,
    category: String,
    name: String,
    /// Syntactically valid JSON, trimmed
    payload: Vec<u8>,
}

impl Record {
    pub fn new(subject_id: u64, category: String, name: String, payload: Vec<u8>) -> Self {
        Self {
            subject_id,
            category,
            name,
            payload,
        }
    }

    pub fn subject_id(&self) -> u64 {
        self.subject_id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The store key for this record
    pub fn key(&self) -> SegmentationKey {
        SegmentationKey {
            subject_id: self.subject_id,
            category: self.category.clone(),
            name: self.name.clone(),
        }
    }
}

/// Unique key of a stored segmentation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentationKey {
    pub subject_id: u64,
    pub category: String,
    pub name: String,
}

/// Three-way classification of a store upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// The store accepted the record but changed nothing
    NoOp,
}

impl UpsertOutcome {
    /// Event name logged by workers for this outcome
    pub fn event(&self) -> &'static str {
        match self {
            UpsertOutcome::Inserted => "upsert_inserted",
            UpsertOutcome::Updated => "upsert_updated",
            UpsertOutcome::NoOp => "upsert_noop",
        }
    }
}
