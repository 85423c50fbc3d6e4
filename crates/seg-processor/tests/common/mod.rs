//! Shared helpers for the processor integration tests
//!
//! Input files are written to temp files that live as long as the returned
//! handle. The stores here script failure and latency so the pipeline can be
//! driven into its error and backpressure paths without a database.

#![allow(dead_code)]

use async_trait::async_trait;
use seg_processor::{MemoryStore, Record, SegmentationStore, StoreError, UpsertOutcome};
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

pub const HEADER: &str = "user_id,segmentation_type,segmentation_name,data";

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,seg_processor=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Write `rows` under the standard header
pub fn csv_file(rows: &[&str]) -> NamedTempFile {
    let mut lines = vec![HEADER.to_string()];
    lines.extend(rows.iter().map(|r| r.to_string()));
    raw_file(format!("{}\n", lines.join("\n")).as_bytes())
}

/// Write exactly `bytes`, header included if wanted
pub fn raw_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(bytes).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// `count` distinct valid rows for subjects `0..count`
pub fn generated_rows(count: u64) -> Vec<String> {
    (0..count)
        .map(|id| format!(r#"{id},drug,Compound-{id},"{{""batch"": {id}}}""#))
        .collect()
}

/// Fails every upsert
pub struct FailingStore;

#[async_trait]
impl SegmentationStore for FailingStore {
    async fn upsert(&self, _record: &Record) -> Result<UpsertOutcome, StoreError> {
        Err(StoreError::Unavailable("connection reset by peer".to_string()))
    }
}

/// Accepts every upsert and reports it as unchanged
pub struct NoOpStore;

#[async_trait]
impl SegmentationStore for NoOpStore {
    async fn upsert(&self, _record: &Record) -> Result<UpsertOutcome, StoreError> {
        Ok(UpsertOutcome::NoOp)
    }
}

/// Sleeps before every insert
pub struct SlowStore {
    pub delay: Duration,
}

#[async_trait]
impl SegmentationStore for SlowStore {
    async fn upsert(&self, _record: &Record) -> Result<UpsertOutcome, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(UpsertOutcome::Inserted)
    }
}

/// Holds every upsert until `release` is cancelled
#[derive(Default)]
pub struct GatedStore {
    pub release: CancellationToken,
    pub started: AtomicU64,
}

impl GatedStore {
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SegmentationStore for GatedStore {
    async fn upsert(&self, _record: &Record) -> Result<UpsertOutcome, StoreError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.release.cancelled().await;
        Ok(UpsertOutcome::Inserted)
    }
}

/// In-memory store that counts every upsert it sees
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    calls: AtomicU64,
}

impl CountingStore {
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SegmentationStore for CountingStore {
    async fn upsert(&self, record: &Record) -> Result<UpsertOutcome, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(record).await
    }
}
