//! Submission unit resolution
//!
//! Turns raw named payloads into [`SubmissionUnit`]s: the student identifier
//! is the base filename with its extension stripped, and the final filename
//! gets an optional suffix inserted before the extension. Payloads with an
//! empty derived identifier are skipped with a warning; they never abort the
//! batch.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::types::{PayloadSource, StudentId, SubmissionUnit};

/// A raw named payload before resolution (e.g. one uploaded form file)
#[derive(Clone, Debug)]
pub struct NamedBlob {
    /// Original filename, including extension
    pub name: String,
    /// Payload bytes
    pub bytes: Vec<u8>,
}

impl NamedBlob {
    /// Create a new named blob
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Resolve a batch of in-memory payloads into submission units
///
/// Two blobs that resolve to the same final filename collide; the later one
/// replaces the earlier. This is intentional last-write-wins, not an error —
/// a re-exported scan of the same student should supersede the first copy.
pub fn resolve_units(blobs: Vec<NamedBlob>, suffix: Option<&str>) -> Vec<SubmissionUnit> {
    let mut units: Vec<SubmissionUnit> = Vec::with_capacity(blobs.len());
    let mut by_filename: HashMap<String, usize> = HashMap::new();

    for blob in blobs {
        let Some((stem, ext)) = split_name(&blob.name) else {
            tracing::warn!(name = %blob.name, "skipping payload with empty identifier");
            continue;
        };
        let filename = final_filename(stem, ext, suffix);
        let unit = SubmissionUnit {
            student_id: StudentId::new(stem),
            filename: filename.clone(),
            source: PayloadSource::Bytes(blob.bytes),
        };
        match by_filename.get(&filename) {
            Some(&index) => {
                tracing::warn!(filename = %filename, "duplicate final filename, keeping later payload");
                units[index] = unit;
            }
            None => {
                by_filename.insert(filename, units.len());
                units.push(unit);
            }
        }
    }

    units
}

/// Resolve the `.pdf` entries of a local directory into submission units
///
/// Matching is case-insensitive on the extension. The payloads stay on disk
/// ([`PayloadSource::File`]) and are read when the unit is processed, so a
/// file removed between listing and processing yields a `NotFound` outcome
/// for that unit instead of failing the batch. Entries are sorted by name
/// for a stable processing order.
pub fn units_from_dir(dir: &Path, suffix: Option<&str>) -> Result<Vec<SubmissionUnit>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    paths.sort();

    let mut units = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!(path = %path.display(), "skipping non-UTF-8 filename");
            continue;
        };
        let Some((stem, ext)) = split_name(name) else {
            tracing::warn!(name = %name, "skipping payload with empty identifier");
            continue;
        };
        units.push(SubmissionUnit {
            student_id: StudentId::new(stem),
            filename: final_filename(stem, ext, suffix),
            source: PayloadSource::File(path.clone()),
        });
    }

    Ok(units)
}

/// Split a filename into (stem, extension), rejecting empty stems
///
/// `"1001.pdf"` → `("1001", "pdf")`. Names without an extension keep an
/// empty extension. Returns `None` when the derived identifier would be
/// empty (e.g. `".pdf"`).
fn split_name(name: &str) -> Option<(&str, &str)> {
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, ext),
        None => (name, ""),
    };
    if stem.is_empty() {
        None
    } else {
        Some((stem, ext))
    }
}

/// Build the final filename: `{stem}-{suffix}.{ext}` when a suffix is set,
/// else the original name
fn final_filename(stem: &str, ext: &str, suffix: Option<&str>) -> String {
    match (suffix, ext.is_empty()) {
        (Some(suffix), false) => format!("{stem}-{suffix}.{ext}"),
        (Some(suffix), true) => format!("{stem}-{suffix}"),
        (None, false) => format!("{stem}.{ext}"),
        (None, true) => stem.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_is_name_without_extension() {
        let units = resolve_units(vec![NamedBlob::new("1001.pdf", vec![1, 2, 3])], None);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].student_id, StudentId::new("1001"));
        assert_eq!(units[0].filename, "1001.pdf");
        assert_eq!(units[0].source, PayloadSource::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn suffix_is_inserted_before_extension() {
        let units = resolve_units(vec![NamedBlob::new("1002.pdf", vec![])], Some("retake"));
        assert_eq!(units[0].filename, "1002-retake.pdf");
        assert_eq!(units[0].student_id, StudentId::new("1002"));
    }

    #[test]
    fn empty_identifier_is_skipped_not_fatal() {
        let units = resolve_units(
            vec![
                NamedBlob::new(".pdf", vec![]),
                NamedBlob::new("1003.pdf", vec![]),
            ],
            None,
        );
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].student_id, StudentId::new("1003"));
    }

    #[test]
    fn duplicate_final_filename_is_last_write_wins() {
        let units = resolve_units(
            vec![
                NamedBlob::new("1001.pdf", vec![1]),
                NamedBlob::new("1001.pdf", vec![2]),
            ],
            None,
        );
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].source, PayloadSource::Bytes(vec![2]));
    }

    #[test]
    fn name_without_extension_keeps_identifier() {
        let units = resolve_units(vec![NamedBlob::new("1004", vec![])], Some("s"));
        assert_eq!(units[0].student_id, StudentId::new("1004"));
        assert_eq!(units[0].filename, "1004-s");
    }

    #[test]
    fn multi_dot_name_strips_only_last_extension() {
        let units = resolve_units(vec![NamedBlob::new("1005.final.pdf", vec![])], None);
        assert_eq!(units[0].student_id, StudentId::new("1005.final"));
        assert_eq!(units[0].filename, "1005.final.pdf");
    }

    #[test]
    fn units_from_dir_keeps_only_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1001.pdf"), b"a").unwrap();
        std::fs::write(dir.path().join("1002.PDF"), b"b").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"c").unwrap();

        let units = units_from_dir(dir.path(), None).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].student_id, StudentId::new("1001"));
        assert_eq!(units[1].student_id, StudentId::new("1002"));
        assert!(matches!(units[0].source, PayloadSource::File(_)));
    }

    #[test]
    fn units_from_dir_applies_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1002.pdf"), b"x").unwrap();

        let units = units_from_dir(dir.path(), Some("retake")).unwrap();
        assert_eq!(units[0].filename, "1002-retake.pdf");
    }

    #[test]
    fn units_from_dir_missing_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        assert!(units_from_dir(&missing, None).is_err());
    }
}
