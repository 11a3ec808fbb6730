//! Configuration types for canvas-batch-submit

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration for a batch run
///
/// Read once per run and handed to
/// [`SubmissionPipeline::new`](crate::pipeline::SubmissionPipeline::new) —
/// never process-wide mutable state. All fields have sensible defaults so a
/// caller only needs to fill in the API credentials.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Grading service endpoint and credentials
    #[serde(default)]
    pub api: ApiConfig,

    /// Batch behavior (concurrency, naming, submission policy)
    #[serde(default)]
    pub batch: BatchConfig,

    /// Retry behavior for transient network failures
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Grading service endpoint and credentials
///
/// The token is an opaque bearer token supplied by the caller and used
/// as-is on every request; no authentication flow is performed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the grading service (e.g. "https://canvas.example.edu")
    #[serde(default)]
    pub base_url: String,

    /// Opaque bearer token sent in the Authorization header of every call
    #[serde(default)]
    pub token: String,

    /// Per-call timeout (default: 30 seconds)
    ///
    /// A timed-out call surfaces as a network error, terminal for that unit
    /// only.
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Batch behavior configuration (concurrency, naming, submission policy)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum units processed concurrently (default: 3)
    ///
    /// A value of 0 is clamped to 1. Unbounded fan-out against the grading
    /// service is not supported.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_units: usize,

    /// Optional suffix inserted before the extension of every final filename
    /// (`1002.pdf` + suffix `retake` → `1002-retake.pdf`)
    #[serde(default)]
    pub filename_suffix: Option<String>,

    /// Content type reported to the initiate call (default: "application/pdf")
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Whether units stop after upload or continue to submission
    #[serde(default)]
    pub mode: SubmissionMode,

    /// How the submission's file list relates to already-attached files
    #[serde(default)]
    pub attachment_policy: AttachmentPolicy,

    /// Directory payloads are staged in before upload (default: "./spool")
    ///
    /// Spool files are removed on every exit path, including failures.
    #[serde(default = "default_spool_dir")]
    pub spool_dir: PathBuf,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_units: default_max_concurrent(),
            filename_suffix: None,
            content_type: default_content_type(),
            mode: SubmissionMode::default(),
            attachment_policy: AttachmentPolicy::default(),
            spool_dir: default_spool_dir(),
        }
    }
}

/// Whether the pipeline submits uploaded files as assignment submissions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// Upload the file and stop; the unit's outcome is `Uploaded`
    UploadOnly,
    /// Upload, then post an "online upload" submission as the student (default)
    #[default]
    Submit,
}

/// How the submission's file list relates to already-attached files
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentPolicy {
    /// Submit only the newly uploaded file
    Replace,
    /// Fetch the student's existing submission attachments and submit the
    /// deduplicated union plus the new file (default)
    ///
    /// A failed fetch degrades to an empty existing set — a student with no
    /// prior submission is not an error.
    #[default]
    Merge,
}

/// Retry configuration for transient network failures
///
/// Applies per remote call, never per unit: HTTP-status failures (403 and
/// friends) are terminal for the unit and are not retried.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// The course/assignment pair a batch is submitted against
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentTarget {
    /// Course identifier
    pub course_id: String,
    /// Assignment identifier within the course
    pub assignment_id: String,
}

impl AssignmentTarget {
    /// Create a target from explicit course and assignment ids
    pub fn new(course_id: impl Into<String>, assignment_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            assignment_id: assignment_id.into(),
        }
    }

    /// Parse a target out of an assignment link
    ///
    /// Looks for the named path segments `/courses/{id}` and
    /// `/assignments/{id}` anywhere in the link, so trailing segments such
    /// as `/edit` or query strings don't matter. Fixed-offset splitting of
    /// the path is deliberately not used.
    ///
    /// # Example
    ///
    /// ```
    /// use canvas_batch_submit::AssignmentTarget;
    ///
    /// let target = AssignmentTarget::from_link(
    ///     "https://canvas.example.edu/courses/101/assignments/2002",
    /// ).unwrap();
    /// assert_eq!(target.course_id, "101");
    /// assert_eq!(target.assignment_id, "2002");
    /// ```
    pub fn from_link(link: &str) -> Result<Self> {
        let url = url::Url::parse(link)
            .map_err(|e| Error::InvalidAssignmentLink(format!("{link}: {e}")))?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let value_after = |name: &str| -> Option<&str> {
            segments
                .iter()
                .position(|seg| *seg == name)
                .and_then(|i| segments.get(i + 1))
                .copied()
        };

        match (value_after("courses"), value_after("assignments")) {
            (Some(course), Some(assignment)) => Ok(Self::new(course, assignment)),
            _ => Err(Error::InvalidAssignmentLink(format!(
                "{link}: expected /courses/{{id}}/assignments/{{id}} path segments"
            ))),
        }
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_concurrent() -> usize {
    3
}

fn default_content_type() -> String {
    "application/pdf".to_string()
}

fn default_spool_dir() -> PathBuf {
    PathBuf::from("./spool")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = Config::default();
        assert_eq!(config.batch.max_concurrent_units, 3);
        assert_eq!(config.batch.content_type, "application/pdf");
        assert_eq!(config.batch.mode, SubmissionMode::Submit);
        assert_eq!(config.batch.attachment_policy, AttachmentPolicy::Merge);
        assert_eq!(config.api.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn config_deserializes_from_partial_json() {
        let config: Config = serde_json::from_str(
            r#"{
                "api": {"base_url": "https://canvas.example.edu", "token": "t"},
                "batch": {"max_concurrent_units": 8, "filename_suffix": "retake"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://canvas.example.edu");
        assert_eq!(config.batch.max_concurrent_units, 8);
        assert_eq!(config.batch.filename_suffix.as_deref(), Some("retake"));
        // Untouched sections keep their defaults
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.api.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn duration_round_trips_as_seconds() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["api"]["request_timeout"], 30);
        assert_eq!(json["retry"]["initial_delay"], 1);
    }

    #[test]
    fn submission_mode_uses_snake_case() {
        let json = serde_json::to_string(&SubmissionMode::UploadOnly).unwrap();
        assert_eq!(json, "\"upload_only\"");
        let mode: SubmissionMode = serde_json::from_str("\"submit\"").unwrap();
        assert_eq!(mode, SubmissionMode::Submit);
    }

    #[test]
    fn from_link_parses_named_segments() {
        let target = AssignmentTarget::from_link(
            "https://canvas-parra.beta.instructure.com/courses/101/assignments/2002",
        )
        .unwrap();
        assert_eq!(target, AssignmentTarget::new("101", "2002"));
    }

    #[test]
    fn from_link_tolerates_extra_segments_and_query() {
        let target = AssignmentTarget::from_link(
            "https://canvas.example.edu/prefix/courses/7/assignments/9/edit?module_item_id=3",
        )
        .unwrap();
        assert_eq!(target, AssignmentTarget::new("7", "9"));
    }

    #[test]
    fn from_link_rejects_missing_assignment_segment() {
        let err = AssignmentTarget::from_link("https://canvas.example.edu/courses/101")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAssignmentLink(_)));
    }

    #[test]
    fn from_link_rejects_unparseable_url() {
        let err = AssignmentTarget::from_link("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidAssignmentLink(_)));
    }
}
