//! Error types for the Authlex library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`AuthlexError`] enum. Analysis-time operations (scoring, vectorizing,
//! prediction) are total and never surface an error; the variants here cover
//! construction, extraction, training, and storage.

use std::io;

use anyhow;
use thiserror::Error;

/// The main error type for Authlex operations.
#[derive(Error, Debug)]
pub enum AuthlexError {
    /// Training was requested with too few accumulated examples.
    #[error("insufficient training data: need at least {min} examples, got {actual}")]
    InsufficientData { min: usize, actual: usize },

    /// Model architecture construction failed.
    #[error("model build error: {0}")]
    ModelBuild(String),

    /// Model fitting failed; the classifier has been rebuilt on the fallback
    /// architecture and remains usable.
    #[error("training error: {0}")]
    Training(String),

    /// No usable text to label or segment.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Text analysis errors (pattern compilation, tokenization).
    #[error("analysis error: {0}")]
    Analysis(String),

    /// Artifact storage errors.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error
    #[error("error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with AuthlexError.
pub type Result<T> = std::result::Result<T, AuthlexError>;

impl AuthlexError {
    /// Create a new insufficient-data error.
    pub fn insufficient_data(min: usize, actual: usize) -> Self {
        AuthlexError::InsufficientData { min, actual }
    }

    /// Create a new model build error.
    pub fn model_build<S: Into<String>>(msg: S) -> Self {
        AuthlexError::ModelBuild(msg.into())
    }

    /// Create a new training error.
    pub fn training<S: Into<String>>(msg: S) -> Self {
        AuthlexError::Training(msg.into())
    }

    /// Create a new extraction error.
    pub fn extraction<S: Into<String>>(msg: S) -> Self {
        AuthlexError::Extraction(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        AuthlexError::Analysis(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        AuthlexError::Storage(msg.into())
    }
}
