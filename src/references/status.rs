//! Upload status reconciliation.
//!
//! Compares the files in a project's uploads directory against the store and
//! reports a status per file. This path is polled, so it always returns a
//! well-formed response: a store that cannot be loaded downgrades to an
//! `error` status with an empty list.

use std::path::Path;

use crate::references::error::{ReferenceError, ReferenceResult};
use crate::references::model::{IngestStatus, ReferenceStatus, ResponseStatus, StatusResponse};
use crate::references::storage::JsonStorage;

/// Regular, non-hidden file names in an uploads directory, sorted.
pub fn list_uploads(dir: &Path) -> ReferenceResult<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| ReferenceError::InputDirectory {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            tracing::debug!(path = %entry.path().display(), "skipping non-UTF-8 file name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Report the processing status of each upload.
///
/// Reloads the store first. A missing store file counts as empty; any other
/// load failure yields an `error` response with no entries. A file ingested
/// more than once reports its newest record; uploads with no matching stored
/// reference are reported as `processing`.
pub fn emit_statuses<S: AsRef<str>>(storage: &mut JsonStorage, uploads: &[S]) -> StatusResponse {
    if let Err(e) = storage.load_or_empty() {
        tracing::warn!(
            path = %storage.path().display(),
            error = %e,
            "unable to load reference store for status check"
        );
        return StatusResponse {
            status: ResponseStatus::Error,
            reference_statuses: Vec::new(),
        };
    }

    let reference_statuses = uploads
        .iter()
        .map(|upload| {
            let source_filename = upload.as_ref();
            let status = storage
                .references()
                .iter()
                .rfind(|r| r.source_filename == source_filename)
                .map_or(IngestStatus::Processing, |r| r.status);
            ReferenceStatus {
                source_filename: source_filename.to_string(),
                status,
            }
        })
        .collect();

    StatusResponse {
        status: ResponseStatus::Ok,
        reference_statuses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::model::Reference;

    fn stored(name: &str, status: IngestStatus) -> Reference {
        let mut r = Reference::new(name);
        r.status = status;
        r.citation_key = Some(name.trim_end_matches(".pdf").into());
        r
    }

    #[test]
    fn missing_store_reports_processing() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut storage = JsonStorage::open(dir.path().join("references.json"));
        assert!(storage.load().is_err());

        let response = emit_statuses(&mut storage, &["a.pdf", "b.pdf"]);
        assert_eq!(response.status, ResponseStatus::Ok);
        assert_eq!(response.reference_statuses.len(), 2);
        assert!(
            response
                .reference_statuses
                .iter()
                .all(|s| s.status == IngestStatus::Processing)
        );
    }

    #[test]
    fn stored_statuses_are_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut storage = JsonStorage::open(dir.path().join("references.json"));
        storage.extend([
            stored("done.pdf", IngestStatus::Complete),
            stored("bad.pdf", IngestStatus::Failure),
        ]);
        storage.save().unwrap();

        let response = emit_statuses(&mut storage, &["bad.pdf", "done.pdf", "new.pdf"]);
        assert_eq!(response.status, ResponseStatus::Ok);
        let statuses: Vec<_> = response
            .reference_statuses
            .iter()
            .map(|s| (s.source_filename.as_str(), s.status))
            .collect();
        assert_eq!(
            statuses,
            [
                ("bad.pdf", IngestStatus::Failure),
                ("done.pdf", IngestStatus::Complete),
                ("new.pdf", IngestStatus::Processing),
            ]
        );
    }

    #[test]
    fn reingested_file_reports_newest_record() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut storage = JsonStorage::open(dir.path().join("references.json"));
        storage.extend([
            stored("a.pdf", IngestStatus::Failure),
            stored("a.pdf", IngestStatus::Complete),
        ]);
        storage.save().unwrap();

        let response = emit_statuses(&mut storage, &["a.pdf"]);
        assert_eq!(response.reference_statuses.len(), 1);
        assert_eq!(response.reference_statuses[0].status, IngestStatus::Complete);
    }

    #[test]
    fn corrupt_store_reports_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("references.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut storage = JsonStorage::open(&path);
        let response = emit_statuses(&mut storage, &["a.pdf"]);
        assert_eq!(response.status, ResponseStatus::Error);
        assert!(response.reference_statuses.is_empty());
    }

    #[test]
    fn list_uploads_skips_hidden_and_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.pdf"), "x").unwrap();
        std::fs::write(dir.path().join("a.pdf"), "x").unwrap();
        std::fs::write(dir.path().join(".DS_Store"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        assert_eq!(list_uploads(dir.path()).unwrap(), ["a.pdf", "b.pdf"]);
        assert!(list_uploads(&dir.path().join("missing")).is_err());
    }
}
