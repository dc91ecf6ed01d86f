use serde::Serialize;
use thiserror::Error;

use crate::types::ResourceKind;

/// A single resource kind could not be listed. Non-fatal: the snapshot keeps
/// an empty slice for that kind and carries this error alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("error retrieving {kind}: {message}")]
pub struct FetchError {
    pub kind: ResourceKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: ResourceKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn timed_out(kind: ResourceKind) -> Self {
        Self::new(kind, "deadline expired before the API answered")
    }
}

/// Logs of a crashing pod could not be read. The message becomes the
/// finding's evidence instead of the log line.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("failed to retrieve logs for {namespace}/{pod}: {message}")]
pub struct LogRetrievalError {
    pub namespace: String,
    pub pod: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a finite number greater than 0, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("invalid value for {name}: {value:?}")]
    Unparsable { name: &'static str, value: String },

    #[error("cannot read threshold file {path}: {source}")]
    ThresholdFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed threshold file {path}: {source}")]
    ThresholdFileFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown OUTPUT_FORMAT {0:?} (expected text or json)")]
    OutputFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum EvaluatorError {
    #[error("evaluator {evaluator} panicked: {message}")]
    Panicked { evaluator: String, message: String },

    #[error("evaluator {evaluator} was cancelled")]
    Cancelled { evaluator: String },
}
