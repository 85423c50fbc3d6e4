//! Streaming reader for the delimited input file
//!
//! The file is never loaded whole: rows are pulled one at a time, and the
//! header row is consumed when the reader is opened.

use csv_async::{AsyncReader, AsyncReaderBuilder, ErrorKind, StringRecord};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tracing::{debug, warn};

use crate::error::ProcessorError;

/// One raw data row with its 1-based line position (the header is row 1)
#[derive(Debug, Clone)]
pub struct RawRow {
    pub row: u64,
    pub fields: StringRecord,
}

pub struct SourceReader {
    path: PathBuf,
    reader: AsyncReader<File>,
    record: StringRecord,
    row: u64,
    finished: bool,
}

impl SourceReader {
    /// Open `path` and discard its header row
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ProcessorError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .map_err(|source| ProcessorError::Open {
                path: path.clone(),
                source,
            })?;

        let reader = AsyncReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .create_reader(file);

        let mut source = Self {
            path,
            reader,
            record: StringRecord::new(),
            row: 0,
            finished: false,
        };
        source.discard_header().await?;
        Ok(source)
    }

    async fn discard_header(&mut self) -> Result<(), ProcessorError> {
        self.row = 1;
        match self.reader.read_record(&mut self.record).await {
            Ok(true) => {
                debug!(path = %self.path.display(), columns = self.record.len(), "header discarded");
                Ok(())
            }
            Ok(false) => Err(ProcessorError::MissingHeader {
                path: self.path.clone(),
            }),
            Err(source) => Err(ProcessorError::HeaderRead {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Number of the row most recently attempted
    pub fn row(&self) -> u64 {
        self.row
    }

    /// Next readable row, or `None` at end of input
    ///
    /// Rows that fail to parse are logged with their row number and skipped. An I/O
    /// failure is logged the same way and ends the stream, since the underlying file
    /// cannot make progress past it.
    pub async fn next_row(&mut self) -> Option<RawRow> {
        while !self.finished {
            self.row += 1;
            match self.reader.read_record(&mut self.record).await {
                Ok(true) => {
                    return Some(RawRow {
                        row: self.row,
                        fields: self.record.clone(),
                    })
                }
                Ok(false) => self.finished = true,
                Err(err) => {
                    warn!("csv_read_error row={} err={}", self.row, err);
                    if matches!(err.kind(), ErrorKind::Io(_)) {
                        self.finished = true;
                    }
                }
            }
        }
        None
    }
}
