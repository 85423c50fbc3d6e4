//! Processor error types

use std::path::PathBuf;
use thiserror::Error;

/// Unrecoverable setup failures that abort a run before any worker starts
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("cannot open input {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read header row of {path}: {source}")]
    HeaderRead {
        path: PathBuf,
        #[source]
        source: csv_async::Error,
    },

    #[error("input {path} has no header row")]
    MissingHeader { path: PathBuf },

    #[error(transparent)]
    Config(#[from] seg_common::SegError),
}
