//! Core types and events for canvas-batch-submit

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Identifier of the student a submission unit belongs to
///
/// Derived from the payload's base filename with the extension stripped
/// (`1001.pdf` → `1001`). Opaque to this crate; the grading service decides
/// what a valid identifier looks like.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

impl StudentId {
    /// Create a new StudentId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StudentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StudentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for StudentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque identifier the grading service assigns to an uploaded blob
///
/// The service reports it either as the trailing path segment of a redirect
/// `Location` header or as an `id` field (number or string) in a JSON body.
/// Stored as a string either way; it is only ever echoed back to the service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteFileId(pub String);

impl RemoteFileId {
    /// Create a new RemoteFileId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Extract the file id from a redirect `Location` URL's trailing path segment
    ///
    /// Returns `None` when the URL has no non-empty trailing segment.
    pub fn from_location(location: &str) -> Option<Self> {
        let trimmed = location.trim_end_matches('/');
        let segment = trimmed.rsplit('/').next()?;
        if segment.is_empty() {
            None
        } else {
            Some(Self(segment.to_string()))
        }
    }

    /// Extract the file id from a JSON `id` value (number or string)
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            serde_json::Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteFileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a unit's payload bytes come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadSource {
    /// Payload already held in memory (e.g. a form upload)
    Bytes(Vec<u8>),
    /// Payload read from the local filesystem at processing time
    ///
    /// A file that vanishes between listing and processing yields a
    /// `NotFound` outcome for the unit, never a crash.
    File(PathBuf),
}

/// One student's PDF submission moving through the pipeline
///
/// Immutable after creation: each unit maps to at most one upload ticket and
/// at most one remote file id per pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionUnit {
    /// The student this unit is submitted on behalf of
    pub student_id: StudentId,
    /// Final filename presented to the grading service (suffix applied)
    pub filename: String,
    /// Payload source, resolved to bytes when the unit is processed
    pub source: PayloadSource,
}

/// Upload target returned by the initiate call
///
/// Consumed exactly once by the byte-upload call and never persisted.
#[derive(Clone, Debug, Deserialize)]
pub struct UploadTicket {
    /// URL the raw bytes must be posted to
    pub upload_url: String,
    /// Form parameters that must accompany the bytes
    pub upload_params: HashMap<String, String>,
}

/// Terminal state of a single unit after a pipeline run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitOutcome {
    /// File uploaded; no submission was requested (upload-only mode)
    Uploaded(RemoteFileId),
    /// File uploaded and submitted on the student's behalf
    Submitted(RemoteFileId),
    /// Unit failed at some step; the reason is the rendered error
    Failed(String),
}

impl UnitOutcome {
    /// Returns true if the unit ended in failure
    pub fn is_failed(&self) -> bool {
        matches!(self, UnitOutcome::Failed(_))
    }
}

/// Per-unit result recorded by the pipeline
///
/// A batch of N units always produces exactly N of these, regardless of how
/// many units failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionResult {
    /// The student the unit belonged to
    pub student_id: StudentId,
    /// How the unit ended
    pub outcome: UnitOutcome,
}

/// Events emitted by the pipeline
///
/// Delivered on a broadcast channel; consumers subscribe via
/// [`SubmissionPipeline::subscribe`](crate::pipeline::SubmissionPipeline::subscribe).
/// One event per unit per step outcome, plus one terminal batch notice.
#[derive(Clone, Debug)]
pub enum Event {
    /// A unit began processing
    UnitStarted {
        /// The student whose unit started
        student_id: StudentId,
    },
    /// A unit's payload was uploaded and assigned a remote file id
    FileUploaded {
        /// The student whose payload was uploaded
        student_id: StudentId,
        /// The id the grading service assigned to the blob
        file_id: RemoteFileId,
    },
    /// A unit's submission record was accepted by the grading service
    UnitSubmitted {
        /// The student the submission was recorded for
        student_id: StudentId,
        /// The newly attached file id
        file_id: RemoteFileId,
    },
    /// A unit failed at some step and was recorded as such
    UnitFailed {
        /// The student whose unit failed
        student_id: StudentId,
        /// Rendered failure reason
        reason: String,
    },
    /// The batch finished; emitted exactly once per run
    BatchCompleted {
        /// Number of units processed
        total: usize,
        /// Number of units that ended in failure
        failed: usize,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_file_id_from_location_takes_trailing_segment() {
        let id = RemoteFileId::from_location("https://x/files/555").unwrap();
        assert_eq!(id, RemoteFileId::new("555"));
    }

    #[test]
    fn remote_file_id_from_location_ignores_trailing_slash() {
        let id = RemoteFileId::from_location("https://x/files/555/").unwrap();
        assert_eq!(id, RemoteFileId::new("555"));
    }

    #[test]
    fn remote_file_id_from_location_rejects_empty() {
        assert!(RemoteFileId::from_location("").is_none());
        assert!(RemoteFileId::from_location("///").is_none());
    }

    #[test]
    fn remote_file_id_from_json_number() {
        let id = RemoteFileId::from_json(&serde_json::json!(555)).unwrap();
        assert_eq!(id.as_str(), "555");
    }

    #[test]
    fn remote_file_id_from_json_string() {
        let id = RemoteFileId::from_json(&serde_json::json!("abc-1")).unwrap();
        assert_eq!(id.as_str(), "abc-1");
    }

    #[test]
    fn remote_file_id_from_json_rejects_other_shapes() {
        assert!(RemoteFileId::from_json(&serde_json::json!(null)).is_none());
        assert!(RemoteFileId::from_json(&serde_json::json!("")).is_none());
        assert!(RemoteFileId::from_json(&serde_json::json!({"id": 1})).is_none());
    }

    #[test]
    fn upload_ticket_deserializes_from_initiate_response() {
        let ticket: UploadTicket = serde_json::from_value(serde_json::json!({
            "upload_url": "https://x/y",
            "upload_params": {"a": "b"},
        }))
        .unwrap();
        assert_eq!(ticket.upload_url, "https://x/y");
        assert_eq!(ticket.upload_params.get("a").map(String::as_str), Some("b"));
    }

    #[test]
    fn student_id_serializes_transparently() {
        let json = serde_json::to_string(&StudentId::new("1001")).unwrap();
        assert_eq!(json, "\"1001\"");
    }
}
