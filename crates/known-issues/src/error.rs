//! Error types for known-issue declarations

use thiserror::Error;

/// Result type alias using [`KnownIssueError`]
pub type KnownIssueResult<T> = std::result::Result<T, KnownIssueError>;

/// Errors raised while declaring or loading known issues.
///
/// These never describe a guarded body's failure; a body's own error is
/// always handed back to the caller untouched.
#[derive(Error, Debug)]
pub enum KnownIssueError {
    #[error("Known issue reference must not be empty")]
    EmptyReference,

    #[error("Invalid message pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unknown error kind '{0}'")]
    UnknownKind(String),

    #[error("Manifest entry #{index} ({reference}): {source}")]
    InvalidEntry {
        index: usize,
        reference: String,
        #[source]
        source: Box<KnownIssueError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
