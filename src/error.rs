//! Error types for a single conversion request.

use std::fmt;
use std::io;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Which of the two exported artifacts a write failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Text,
    Binary,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Text => write!(f, "text"),
            OutputKind::Binary => write!(f, "binary table"),
        }
    }
}

/// Everything that can go wrong while processing one file.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("no source file was selected")]
    InputMissing,

    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{}' is not a readable table: {reason}", .path.display())]
    SourceFormat { path: PathBuf, reason: String },

    #[error("'{input}' is not a valid column index")]
    InvalidIndexFormat { input: String },

    #[error(
        "column index {requested} is out of range; valid indices are {} to {}",
        .valid_range.start(),
        .valid_range.end()
    )]
    IndexRange {
        requested: i64,
        valid_range: RangeInclusive<i64>,
    },

    #[error("failed to write {which} output '{}': {source}", .path.display())]
    Write {
        which: OutputKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    /// Stable identifier for machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::InputMissing => "input_missing",
            ConvertError::Read { .. } => "read_error",
            ConvertError::SourceFormat { .. } => "source_format_error",
            ConvertError::InvalidIndexFormat { .. } => "invalid_index_format",
            ConvertError::IndexRange { .. } => "index_range_error",
            ConvertError::Write { .. } => "write_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
