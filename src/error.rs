//! Error types for dataset loading, index operations and the benchmark run.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to obtain a usable dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("cannot read cities file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read dataset: {0}")]
    Read(#[from] std::io::Error),

    #[error("cities file header is missing the {0:?} column")]
    MissingColumn(&'static str),

    #[error("malformed record on line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("dataset contains no records")]
    Empty,
}

/// Failure of one variant's run: reported by the index, or a workload that
/// does not fit the requested lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("index build failed: {0}")]
    Build(String),

    #[error("nearest-neighbor query failed: {0}")]
    Query(String),

    #[error("workload holds {anchors} anchors but {lookups} lookups were requested")]
    Workload { anchors: usize, lookups: usize },
}

/// Anything that stops a benchmark invocation after argument parsing.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("{variant}: {source}")]
    Index {
        variant: String,
        #[source]
        source: IndexError,
    },

    #[error("cannot write report: {0}")]
    Report(#[from] std::io::Error),
}

impl BenchError {
    pub(crate) fn index(variant: &str, source: IndexError) -> Self {
        BenchError::Index {
            variant: variant.to_owned(),
            source,
        }
    }
}
