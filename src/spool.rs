//! Payload spooling with guaranteed cleanup
//!
//! Before a unit touches the network its payload is materialized into a
//! spool file carrying the final (suffixed) filename. The spool file is
//! removed on every exit path — success, step failure, or panic unwind —
//! via the [`Drop`] impl. Missing source files are detected here, before
//! any remote call is made.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{PayloadSource, SubmissionUnit};

/// A unit's payload staged on disk for the duration of its pipeline steps
#[derive(Debug)]
pub struct SpooledPayload {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl SpooledPayload {
    /// Load a unit's payload and stage it under `spool_dir`
    ///
    /// File-backed sources are read from disk here; a source that has
    /// vanished since listing maps to [`Error::NotFound`] so the pipeline
    /// can record a `NotFound` outcome without making any remote call.
    pub async fn materialize(unit: &SubmissionUnit, spool_dir: &Path) -> Result<Self> {
        let bytes = match &unit.source {
            PayloadSource::Bytes(bytes) => bytes.clone(),
            PayloadSource::File(path) => {
                tokio::fs::read(path).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::NotFound(path.clone())
                    } else {
                        Error::Io(e)
                    }
                })?
            }
        };

        tokio::fs::create_dir_all(spool_dir).await?;
        let path = spool_dir.join(&unit.filename);
        tokio::fs::write(&path, &bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "payload spooled");

        Ok(Self { path, bytes })
    }

    /// The staged payload bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload size in bytes, as reported to the initiate call
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Returns true if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Location of the spool file while the unit is in flight
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SpooledPayload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove spool file");
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StudentId;

    fn bytes_unit(filename: &str, bytes: Vec<u8>) -> SubmissionUnit {
        SubmissionUnit {
            student_id: StudentId::new("1001"),
            filename: filename.to_string(),
            source: PayloadSource::Bytes(bytes),
        }
    }

    #[tokio::test]
    async fn materialize_writes_spool_with_final_filename() {
        let dir = tempfile::tempdir().unwrap();
        let unit = bytes_unit("1001-retake.pdf", vec![1, 2, 3]);

        let spool = SpooledPayload::materialize(&unit, dir.path()).await.unwrap();
        assert_eq!(spool.path(), dir.path().join("1001-retake.pdf"));
        assert_eq!(spool.bytes(), &[1, 2, 3]);
        assert_eq!(spool.len(), 3);
        assert!(spool.path().exists());
    }

    #[tokio::test]
    async fn spool_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let unit = bytes_unit("1001.pdf", vec![9]);

        let path = {
            let spool = SpooledPayload::materialize(&unit, dir.path()).await.unwrap();
            spool.path().to_path_buf()
        };
        assert!(!path.exists(), "spool file should be gone after drop");
    }

    #[tokio::test]
    async fn missing_source_file_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("1001.pdf");
        let unit = SubmissionUnit {
            student_id: StudentId::new("1001"),
            filename: "1001.pdf".to_string(),
            source: PayloadSource::File(gone.clone()),
        };

        let err = SpooledPayload::materialize(&unit, dir.path())
            .await
            .unwrap_err();
        match err {
            Error::NotFound(path) => assert_eq!(path, gone),
            other => panic!("expected NotFound, got {other}"),
        }
    }

    #[tokio::test]
    async fn file_source_reads_bytes_at_materialize_time() {
        let src_dir = tempfile::tempdir().unwrap();
        let spool_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("1002.pdf");
        std::fs::write(&src, b"payload").unwrap();

        let unit = SubmissionUnit {
            student_id: StudentId::new("1002"),
            filename: "1002-retake.pdf".to_string(),
            source: PayloadSource::File(src),
        };
        let spool = SpooledPayload::materialize(&unit, spool_dir.path())
            .await
            .unwrap();
        assert_eq!(spool.bytes(), b"payload");
        assert!(spool_dir.path().join("1002-retake.pdf").exists());
    }
}
