use thiserror::Error;

/// A `date` field that is neither `YYYY-MM` nor `YYYY-MM-DD`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed date {0:?} (expected YYYY-MM or YYYY-MM-DD)")]
pub struct ParseDateError(pub String);

/// Why a CSV row was rejected at ingestion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error("row {row}: {source}")]
    MalformedDate {
        row: usize,
        #[source]
        source: ParseDateError,
    },

    #[error("row {row}: missing {field}")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: {field} is not a finite number: {value:?}")]
    InvalidNumber {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("row {row}: {field} = {value} is out of range")]
    OutOfRange {
        row: usize,
        field: &'static str,
        value: f64,
    },
}

impl IngestError {
    pub fn row(&self) -> usize {
        match self {
            Self::MalformedDate { row, .. }
            | Self::MissingField { row, .. }
            | Self::InvalidNumber { row, .. }
            | Self::OutOfRange { row, .. } => *row,
        }
    }
}
