//! Error types for the cohort-merger crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while updating a cohort track.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// An allocator argument was out of range.
    #[error("invalid {name}: expected a positive value, got {value}")]
    InvalidInput { name: &'static str, value: i64 },

    /// Sample-name extraction failed for one input file.
    #[error("sample extraction failed for `{path}`: {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// No input files were available for the run.
    #[error("no input files: {0}")]
    NoInput(String),

    /// The external merge engine exited unsuccessfully.
    #[error("engine command `{command}` failed with exit code {code}")]
    EngineExecution { command: String, code: i32 },

    /// A referenced artifact disappeared or was never present.
    #[error("missing artifact: `{0}`")]
    MissingArtifact(PathBuf),

    /// Compressed variant files are missing their index companions.
    #[error("{} manifest entries are missing their index companion", .0.len())]
    MissingIndexes(Vec<PathBuf>),

    /// Task-graph serialization or parsing failed.
    #[error("task graph error: {0}")]
    TaskGraph(#[from] serde_yaml::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;
