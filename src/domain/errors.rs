use std::fmt;

use thiserror::Error;

/// Failure of a source adapter as a whole.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Connectivity-level failure; the orchestrator may fall back.
    #[error("source unavailable - {0}")]
    Unavailable(String),
    /// Data or query-level failure on a reachable source; never masked.
    #[error("source query failed - {0}")]
    Query(String),
}

impl SourceError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}

/// A single row failed required-field validation. Skipped and counted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedRecord {
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("invalid value for {field} - {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// One adapter attempt that did not produce records.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub adapter: &'static str,
    pub error: SourceError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.adapter, self.error)
    }
}

fn list(attempts: &[SourceFailure]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Query failed on sales source [{}]", list(.attempts))]
    SourceQuery { attempts: Vec<SourceFailure> },
    #[error("No sales source available [{}]", list(.attempts))]
    SourcesUnavailable { attempts: Vec<SourceFailure> },
}

impl PipelineError {
    pub fn attempts(&self) -> &[SourceFailure] {
        match self {
            PipelineError::SourceQuery { attempts } => attempts,
            PipelineError::SourcesUnavailable { attempts } => attempts,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Error writing CSV report - {0}")]
    Csv(#[from] csv::Error),
    #[error("Error writing report file - {0}")]
    Io(#[from] std::io::Error),
    #[error("Error serializing summary - {0}")]
    Json(#[from] serde_json::Error),
}
