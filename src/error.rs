//! Error types for source access, resolution, and row streaming.

use std::path::PathBuf;

use thiserror::Error;

use crate::{data::ValueKind, schema::OutputKind};

/// Errors raised by the engine before or during streaming.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The step has no source file configured.
    #[error("no source file name is configured")]
    NoSourceLocator,

    /// The configured source could not be opened.
    #[error("source {path:?} cannot be read: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    /// A non-optional field has no matching source column.
    #[error("column '{name}' was not found in the source")]
    FieldNotFound { name: String },

    /// A field matches more than one source column.
    #[error("column '{name}' occurs {count} times in the source")]
    DuplicateColumn { name: String, count: usize },

    /// A field reached streaming without an output type.
    #[error("output type of field '{name}' is not defined")]
    UndeterminedType { name: String },

    /// A cell had a value kind the converter has no rule for.
    #[error(transparent)]
    ConversionMismatch(#[from] ConversionMismatch),

    /// The source failed while producing a row.
    #[error("reading source row {row} failed: {source}")]
    SourceRead {
        row: u64,
        #[source]
        source: SourceError,
    },
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Raised by the converter when a value kind has no conversion rule at all.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("no conversion rule from {observed} values to {target}")]
pub struct UnsupportedValue {
    pub observed: ValueKind,
    pub target: OutputKind,
}

/// An [`UnsupportedValue`] located at a specific field and source position.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error(
    "converting attribute '{source_name}' - {position}({observed}) -> '{field}'({target}) failed at source row {row}"
)]
pub struct ConversionMismatch {
    pub source_name: String,
    pub field: String,
    /// 1-based column position in the source row.
    pub position: usize,
    /// 1-based row number within the streaming session.
    pub row: u64,
    pub observed: ValueKind,
    pub target: OutputKind,
}

/// Failures reported by a tabular source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to decode text with encoding {encoding}")]
    Decode { encoding: &'static str },

    #[error("malformed record {record}: {message}")]
    Malformed { record: u64, message: String },
}
