//! # canvas-batch-submit
//!
//! Batch assignment-submission upload pipeline for Canvas-compatible LMS
//! APIs.
//!
//! Takes a batch of PDF payloads named after student identifiers, resolves
//! each into a submission unit, and drives every unit through the grading
//! service's two-phase upload handshake — optionally followed by posting an
//! "online upload" submission on the student's behalf. Failures are isolated
//! per unit: one student's rejected upload never stops the rest of the
//! batch.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI; the surrounding form/shell merely
//!   invokes the pipeline and displays its results
//! - **Explicit configuration** - Credentials and policy live in a config
//!   struct passed to the pipeline, never in process-wide state
//! - **Bounded concurrency** - Fan-out is capped; unbounded thread-per-unit
//!   behavior is deliberately not supported
//! - **Event-driven** - Consumers subscribe to per-unit progress events
//!
//! ## Quick Start
//!
//! ```no_run
//! use canvas_batch_submit::{AssignmentTarget, Config, SubmissionPipeline, resolver};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.api.base_url = "https://canvas.example.edu".to_string();
//!     config.api.token = "opaque-bearer-token".to_string();
//!
//!     let target = AssignmentTarget::from_link(
//!         "https://canvas.example.edu/courses/101/assignments/2002",
//!     )?;
//!     let units = resolver::units_from_dir(Path::new("./exams"), None)?;
//!
//!     let pipeline = SubmissionPipeline::new(config, target)?;
//!     for result in pipeline.run(units).await {
//!         println!("{}: {:?}", result.student_id, result.outcome);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP client for the grading service
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Batch submission pipeline
pub mod pipeline;
/// Submission unit resolution
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Payload spooling with guaranteed cleanup
pub mod spool;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use client::CanvasClient;
pub use config::{
    ApiConfig, AssignmentTarget, AttachmentPolicy, BatchConfig, Config, RetryConfig,
    SubmissionMode,
};
pub use error::{Error, Result};
pub use pipeline::SubmissionPipeline;
pub use resolver::{NamedBlob, resolve_units, units_from_dir};
pub use spool::SpooledPayload;
pub use types::{
    Event, PayloadSource, RemoteFileId, StudentId, SubmissionResult, SubmissionUnit, UnitOutcome,
    UploadTicket,
};
