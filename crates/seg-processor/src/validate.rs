//! Row validation and normalization
//!
//! Rules are applied in order and the first failure wins:
//! arity, then subject id, then payload syntax.

use csv_async::StringRecord;
use serde::de::IgnoredAny;
use std::fmt;

use crate::record::Record;

/// Minimum number of fields in a data row
pub const REQUIRED_FIELDS: usize = 4;

/// Why a raw row was not turned into a [`Record`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    WrongArity { size: usize },
    BadSubjectId { value: String },
    BadPayload,
}

impl Rejection {
    /// Log line for this rejection at `row`
    pub fn log_line(&self, row: u64) -> String {
        match self {
            Rejection::WrongArity { size } => format!("invalid_row_size row={row} size={size}"),
            Rejection::BadSubjectId { value } => format!("invalid_user_id row={row} value={value:?}"),
            Rejection::BadPayload => format!("invalid_json row={row}"),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::WrongArity { size } => write!(f, "wrong arity ({size} fields)"),
            Rejection::BadSubjectId { value } => write!(f, "bad subject id {value:?}"),
            Rejection::BadPayload => write!(f, "bad payload"),
        }
    }
}

/// Convert one raw row into a record
pub fn validate(fields: &StringRecord) -> Result<Record, Rejection> {
    if fields.len() < REQUIRED_FIELDS {
        return Err(Rejection::WrongArity { size: fields.len() });
    }

    let raw_id = field(fields, 0);
    let subject_id = parse_subject_id(raw_id.trim()).ok_or_else(|| Rejection::BadSubjectId {
        value: raw_id.to_string(),
    })?;

    let payload = field(fields, 3).trim();
    if !is_valid_json(payload) {
        return Err(Rejection::BadPayload);
    }

    Ok(Record::new(
        subject_id,
        field(fields, 1).trim().to_string(),
        field(fields, 2).trim().to_string(),
        payload.as_bytes().to_vec(),
    ))
}

/// Decimal digits only, no sign
fn parse_subject_id(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn field(fields: &StringRecord, index: usize) -> &str {
    fields.get(index).unwrap_or_default()
}

/// Syntax check only; the document is walked but nothing is materialized
fn is_valid_json(raw: &str) -> bool {
    serde_json::from_str::<IgnoredAny>(raw).is_ok()
}
