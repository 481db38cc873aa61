//! Error types for the knowledge base.

use std::path::PathBuf;

/// Errors raised by knowledge base operations.
///
/// Per-record import problems never surface here; they are counted in
/// [`crate::ImportStats`] instead.
#[derive(Debug, thiserror::Error)]
pub enum KbError {
    /// Malformed input to `add_entry` (e.g. a context without word characters).
    #[error("validation error: {0}")]
    Validation(String),

    /// No snapshot path was given and none was configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A file parsed as JSON but does not have the expected shape.
    #[error("format error: {0}")]
    Format(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `transform` was called before `fit`.
    #[error("vectorizer is not fitted")]
    NotFitted,

    #[error("invalid vectorizer parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A snapshot records a non-primitive parameter by tag only, and the
    /// parameter changes vectorization, so it cannot be restored.
    #[error("vectorizer parameter `{name}` was saved as `{tag}` and cannot be restored")]
    UnrestorableParameter { name: String, tag: String },

    #[error("invalid token pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl KbError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, KbError>;
