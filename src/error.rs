//! Error types for canvas-batch-submit
//!
//! Every pipeline error is scoped to a single submission unit: the batch
//! records a failed outcome for that unit and keeps processing the rest.
//! The taxonomy mirrors the remote call sequence (initiation, upload,
//! submission) plus the local failure modes (missing payload, transport).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for canvas-batch-submit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for canvas-batch-submit
///
/// Each variant carries the context needed to report a per-unit failure
/// without aborting the batch.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.base_url")
        key: Option<String>,
    },

    /// Assignment link could not be parsed into course and assignment ids
    #[error("invalid assignment link: {0}")]
    InvalidAssignmentLink(String),

    /// The initiate-upload call did not return an upload ticket
    #[error("upload initiation failed for student {student_id}: HTTP {status}: {message}")]
    Initiation {
        /// The student whose unit failed
        student_id: String,
        /// HTTP status returned by the grading service
        status: u16,
        /// Response body, as far as it could be read
        message: String,
    },

    /// The byte upload to the ticket's target URL was rejected
    #[error("file upload failed for student {student_id}: HTTP {status}: {message}")]
    Upload {
        /// The student whose unit failed
        student_id: String,
        /// HTTP status returned by the upload target
        status: u16,
        /// Response body or a description of what was missing
        message: String,
    },

    /// The submission record was rejected by the grading service
    #[error("submission failed for student {student_id}: HTTP {status}: {message}")]
    Submission {
        /// The student whose unit failed
        student_id: String,
        /// HTTP status returned by the grading service
        status: u16,
        /// Response body, as far as it could be read
        message: String,
    },

    /// Local payload file missing at processing time
    #[error("payload not found: {0}")]
    NotFound(PathBuf),

    /// Network error (transport-level failure or per-call timeout)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}
