//! Error types and load result structures for the rule loader.

use std::path::PathBuf;

/// Errors that can occur during rule loading.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML/JSON parse or deserialization error.
    #[error("parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Rule validation error (e.g. empty id).
    #[error("validation error: {0}")]
    Validation(String),

    /// Filesystem watcher error.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for loader operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// File parsed; these rule ids were read from it.
    Loaded { rule_ids: Vec<String> },
    /// File was skipped (dotfile, unsupported extension).
    Skipped { reason: String },
    /// Parse or validation error. The file's previous rules, if any, are kept.
    Failed { error: String },
}
