use std::path::PathBuf;
use thiserror::Error;

/// Failure surface of the analysis engine.
///
/// Malformed individual tokens are recovered during parsing (substituted or
/// skipped) and never reach this enum; only structural failures abort an
/// analyzer call, and a failed call returns no partial metrics.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The parser produced zero usable rows.
    #[error("no valid data found in file")]
    NoValidData,
    /// The eye-tracker header lacks mandatory quaternion columns.
    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// Every row produced a near-zero-magnitude averaged gaze vector.
    #[error("no valid gaze data computed")]
    NoValidGaze,
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
