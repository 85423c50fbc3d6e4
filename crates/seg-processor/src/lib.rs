//! Segmentation Processor Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Streams a delimited segmentation file into a keyed store. A single reader
//! validates rows and feeds a bounded queue; a pool of workers upserts each
//! record and classifies it as inserted, updated or unchanged.
//!
//! # Example
//!
//! ```no_run
//! use seg_processor::{MemoryStore, Processor, ProcessorConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ProcessorConfig::default().with_data_file("./data/segmentations.csv");
//!     let processor = Processor::new(config, Arc::new(MemoryStore::new()));
//!     let summary = processor.run(CancellationToken::new()).await?;
//!     println!("{} inserted", summary.counters.inserted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod counters;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod processor;
pub mod progress;
pub mod record;
pub mod source;
pub mod store;
pub mod validate;
pub mod worker;

pub use config::ProcessorConfig;
pub use counters::{CounterSnapshot, Counters};
pub use error::ProcessorError;
pub use lifecycle::{DrainReason, Lifecycle, LifecycleState};
pub use processor::{Processor, RunOutcome, RunSummary};
pub use record::{Record, SegmentationKey, UpsertOutcome};
pub use store::{MemoryStore, SegmentationStore, StoreError, StoredSegmentation};
#[cfg(feature = "database")]
pub use store::{DatabaseConfig, PostgresStore};
