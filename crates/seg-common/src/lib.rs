//! Segmentation Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging setup for the segmentation workspace.
//!
//! - **Error Handling**: [`SegError`] and the [`Result`] alias used for configuration and
//!   setup failures
//! - **Logging**: [`logging::init_logging`] installs the global `tracing` subscriber

pub mod error;
pub mod logging;

pub use error::{Result, SegError};
