//! Error types for the ingestion pipeline.

use crate::pipeline::Stage;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A single CSV record that cannot be turned into a graph write.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("missing field `{field}` at position {index}")]
    MissingField { field: &'static str, index: usize },

    #[error("title {0:?} is too short to carry a \" (YYYY)\" suffix")]
    TitleTooShort(String),

    #[error("rating {0:?} is not a finite number")]
    InvalidRating(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("neo4j driver error")]
    Driver(#[from] neo4rs::Error),

    #[error("timed out after {after:?} while trying to {operation}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("failed to decode `{column}` from result row: {message}")]
    Decode { column: &'static str, message: String },
}

/// Fatal failure of a pipeline stage. Every variant names the stage so the
/// process exit message points at where the run stopped.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{stage} stage: cannot open {}", path.display())]
    Open {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{stage} stage: unreadable CSV input")]
    Read {
        stage: Stage,
        #[source]
        source: csv::Error,
    },

    #[error("{stage} stage: malformed record at line {line}")]
    Malformed {
        stage: Stage,
        line: u64,
        #[source]
        source: RecordError,
    },

    #[error("{stage} stage: store write failed at line {line}")]
    Store {
        stage: Stage,
        line: u64,
        #[source]
        source: StoreError,
    },

    #[error("failed to read back seeded genres")]
    GenreCheck(#[source] StoreError),

    #[error("genre seeding incomplete, missing: {}", missing.join(", "))]
    GenreSeedingIncomplete { missing: Vec<String> },

    #[error("{stage} stage: {count} unresolved references (strict mode)")]
    UnresolvedReferences { stage: Stage, count: usize },

    #[error("failed to prepare graph schema")]
    Schema(#[source] StoreError),
}
