//! Batch ingestion pipeline.
//!
//! Orchestrates: stage → extract → materialize → key → persist → clean up.
//!
//! A single document's extraction failure never aborts the batch; it is kept
//! with status `failure` and raw-text contents. An unreachable extractor, an
//! unreadable store, or a write failure aborts the whole batch before anything
//! is written.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::RefshelfConfig;
use crate::paths::ProjectPaths;
use crate::references::chunker::{ChunkConfig, PageText, chunk_pages, join_pages};
use crate::references::citation::assign_citation_keys;
use crate::references::error::{ReferenceError, ReferenceResult};
use crate::references::extract::{
    Artifact, ArtifactIndex, Extractor, TeiDocument, file_stem, is_pdf, parse_tei, pdf,
};
use crate::references::model::{IngestStatus, Reference};
use crate::references::status::list_uploads;
use crate::references::storage::JsonStorage;

pub use crate::references::model::{IngestRequest, IngestResponse};

/// Settings for one ingestion call.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Chunk normalization settings.
    pub chunking: ChunkConfig,
    /// Store file name inside `<project>/.storage/`.
    pub store_file_name: String,
    /// Abort before commit once this instant has passed.
    pub deadline: Option<Instant>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunking: ChunkConfig::default(),
            store_file_name: "references.json".into(),
            deadline: None,
        }
    }
}

impl IngestOptions {
    pub fn from_config(config: &RefshelfConfig) -> Self {
        Self {
            chunking: config.chunking.clone(),
            store_file_name: config.storage.file_name.clone(),
            deadline: None,
        }
    }
}

/// Ingest every PDF in `request.pdf_directory` into its project's store.
///
/// Returns the project name (the uploads directory's parent) and the newly
/// ingested references, exactly as persisted.
pub fn run_ingest(
    request: &IngestRequest,
    extractor: &dyn Extractor,
    options: &IngestOptions,
) -> ReferenceResult<IngestResponse> {
    let input = &request.pdf_directory;
    if !input.is_dir() {
        return Err(ReferenceError::InputDirectory {
            path: input.display().to_string(),
            message: "not a directory".into(),
        });
    }
    let paths = ProjectPaths::from_uploads_dir(input, &options.store_file_name).map_err(|e| {
        ReferenceError::InputDirectory {
            path: input.display().to_string(),
            message: e.to_string(),
        }
    })?;
    paths.ensure_dirs().map_err(|e| ReferenceError::Storage {
        path: paths.root.display().to_string(),
        message: e.to_string(),
    })?;

    let _work_areas = WorkAreas::claim(&paths)?;

    // 1. Stage.
    let staged = stage_uploads(&paths)?;
    tracing::info!(project = %paths.name, count = staged.len(), "staged uploads");
    if staged.is_empty() {
        return Ok(IngestResponse {
            project_name: paths.name.clone(),
            references: Vec::new(),
        });
    }

    // 2. Extract.
    tracing::info!(extractor = extractor.name(), "extracting staged documents");
    extractor.process(&paths.staging_dir, &paths.extraction_dir)?;
    check_deadline(options.deadline)?;

    // 3. Materialize.
    let artifacts = ArtifactIndex::scan(&paths.extraction_dir)?;
    tracing::debug!(artifacts = artifacts.len(), "scanned extraction output");
    let batch: Vec<Reference> = staged
        .iter()
        .map(|name| {
            materialize(
                name,
                &paths.staging_dir.join(name),
                &artifacts,
                &options.chunking,
            )
        })
        .collect();

    // 4. Key against a fresh snapshot.
    let mut storage = JsonStorage::open(&paths.store_file);
    storage.load_or_empty()?;
    let batch = assign_citation_keys(batch, &storage.citation_keys());
    for reference in &batch {
        tracing::debug!(
            file = %reference.source_filename,
            key = reference.citation_key.as_deref().unwrap_or_default(),
            status = %reference.status,
            "materialized reference"
        );
    }

    // 5. Persist.
    check_deadline(options.deadline)?;
    storage.extend(batch.iter().cloned());
    storage.save()?;

    let failed = batch
        .iter()
        .filter(|r| r.status == IngestStatus::Failure)
        .count();
    tracing::info!(
        project = %paths.name,
        ingested = batch.len(),
        failed,
        total = storage.references().len(),
        "ingestion complete"
    );

    Ok(IngestResponse {
        project_name: paths.name.clone(),
        references: batch,
    })
}

/// Copy each PDF upload into the staging area. Returns staged file names in
/// sorted order.
fn stage_uploads(paths: &ProjectPaths) -> ReferenceResult<Vec<String>> {
    let mut staged = Vec::new();
    for name in list_uploads(&paths.uploads_dir)? {
        let source = paths.uploads_dir.join(&name);
        if !is_pdf(&source) {
            tracing::debug!(file = %name, "skipping non-PDF upload");
            continue;
        }
        std::fs::copy(&source, paths.staging_dir.join(&name))?;
        staged.push(name);
    }
    Ok(staged)
}

/// Build the reference for one staged file from its extraction artifact.
fn materialize(
    filename: &str,
    staged: &Path,
    artifacts: &ArtifactIndex,
    chunking: &ChunkConfig,
) -> Reference {
    let mut reference = Reference::new(filename);

    match artifacts.classify(file_stem(filename)) {
        Artifact::Tei(path) => match read_tei(&path) {
            Ok(doc) => {
                apply_tei(&mut reference, doc, staged, chunking);
                return reference;
            }
            Err(e) => {
                tracing::warn!(file = %filename, error = %e, "unreadable TEI artifact, degrading")
            }
        },
        Artifact::FailureMarker { code, .. } => {
            tracing::warn!(file = %filename, code = %code, "extraction failed for document")
        }
        Artifact::Missing => {
            tracing::warn!(file = %filename, "no extraction artifact for document")
        }
    }

    reference.status = IngestStatus::Failure;
    fill_from_raw_text(&mut reference, staged, chunking);
    reference
}

fn read_tei(path: &Path) -> ReferenceResult<TeiDocument> {
    let malformed = |message: String| ReferenceError::MalformedArtifact {
        path: path.display().to_string(),
        message,
    };
    let xml = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    parse_tei(&xml).map_err(malformed)
}

fn apply_tei(reference: &mut Reference, doc: TeiDocument, staged: &Path, chunking: &ChunkConfig) {
    reference.status = IngestStatus::Complete;
    reference.title = doc.title;
    reference.doi = doc.doi;
    reference.published_date = doc.published_date;
    reference.authors = doc.authors;

    if doc.pages.iter().any(|p| !p.text.trim().is_empty()) {
        set_text(reference, &doc.pages, chunking);
    } else {
        tracing::debug!(file = %reference.source_filename, "TEI carries no text, using raw text");
        fill_from_raw_text(reference, staged, chunking);
    }
}

fn fill_from_raw_text(reference: &mut Reference, staged: &Path, chunking: &ChunkConfig) {
    match pdf::extract_pages(staged) {
        Ok(pages) => set_text(reference, &pages, chunking),
        Err(e) => tracing::warn!(
            file = %reference.source_filename,
            error = %e,
            "raw-text fallback failed, contents left empty"
        ),
    }
}

fn set_text(reference: &mut Reference, pages: &[PageText], chunking: &ChunkConfig) {
    reference.contents = join_pages(pages);
    reference.chunks = chunk_pages(pages, &reference.source_filename, chunking);
}

fn check_deadline(deadline: Option<Instant>) -> ReferenceResult<()> {
    match deadline {
        Some(d) if Instant::now() >= d => {
            tracing::warn!("ingestion deadline exceeded, aborting before commit");
            Err(ReferenceError::DeadlineExceeded)
        }
        _ => Ok(()),
    }
}

/// Staging and extraction-output areas owned by one ingestion call. Cleared
/// on claim and again on drop, whatever the exit path.
struct WorkAreas {
    dirs: [PathBuf; 2],
}

impl WorkAreas {
    fn claim(paths: &ProjectPaths) -> ReferenceResult<Self> {
        let areas = Self {
            dirs: [paths.staging_dir.clone(), paths.extraction_dir.clone()],
        };
        for dir in &areas.dirs {
            clear_dir(dir)?;
        }
        Ok(areas)
    }
}

impl Drop for WorkAreas {
    fn drop(&mut self) {
        for dir in &self.dirs {
            if let Err(e) = clear_dir(dir) {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to clean work area");
            }
        }
    }
}

fn clear_dir(dir: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEI: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><teiHeader><fileDesc>
        <titleStmt><title level="a" type="main">A Paper</title></titleStmt>
        <publicationStmt><date type="published" when="2019-06-01">2019</date></publicationStmt>
        <sourceDesc><biblStruct><analytic>
            <author><persName><forename>Ada</forename><surname>Lovelace</surname></persName></author>
        </analytic></biblStruct></sourceDesc>
    </fileDesc></teiHeader>
    <text><body><div><p>Body text of the paper.</p></div></body></text></TEI>"#;

    fn write(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    fn index(dir: &Path) -> ArtifactIndex {
        ArtifactIndex::scan(dir).unwrap()
    }

    #[test]
    fn materialize_tei_is_complete() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "paper.tei.xml", TEI);

        let r = materialize(
            "paper.pdf",
            &dir.path().join("paper.pdf"),
            &index(dir.path()),
            &ChunkConfig::default(),
        );
        assert_eq!(r.status, IngestStatus::Complete);
        assert_eq!(r.title.as_deref(), Some("A Paper"));
        assert_eq!(r.publication_year(), Some(2019));
        assert_eq!(r.authors[0].full_name, "Ada Lovelace");
        assert_eq!(r.contents, "Body text of the paper.");
        assert_eq!(r.chunks.len(), 1);
        assert_eq!(r.chunks[0].metadata.source_filename, "paper.pdf");
        assert_eq!(r.chunks[0].metadata.page_num, 1);
        assert_eq!(r.citation_key, None);
    }

    #[test]
    fn materialize_failure_marker_degrades() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "broken_500.txt", "error 500");
        write(dir.path(), "broken.pdf", "not really a pdf");

        let r = materialize(
            "broken.pdf",
            &dir.path().join("broken.pdf"),
            &index(dir.path()),
            &ChunkConfig::default(),
        );
        assert_eq!(r.status, IngestStatus::Failure);
        assert_eq!(r.title, None);
        assert!(r.authors.is_empty());
        assert!(r.contents.is_empty());
    }

    #[test]
    fn materialize_malformed_tei_degrades() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "odd.tei.xml", "<TEI><teiHeader>");

        let r = materialize(
            "odd.pdf",
            &dir.path().join("odd.pdf"),
            &index(dir.path()),
            &ChunkConfig::default(),
        );
        assert_eq!(r.status, IngestStatus::Failure);
        assert_eq!(r.title, None);
    }

    #[test]
    fn missing_artifact_degrades() {
        let dir = tempfile::TempDir::new().unwrap();
        let r = materialize(
            "ghost.pdf",
            &dir.path().join("ghost.pdf"),
            &index(dir.path()),
            &ChunkConfig::default(),
        );
        assert_eq!(r.status, IngestStatus::Failure);
    }

    #[test]
    fn past_deadline_is_exceeded() {
        assert!(check_deadline(None).is_ok());
        let past = Instant::now();
        assert!(matches!(
            check_deadline(Some(past)),
            Err(ReferenceError::DeadlineExceeded)
        ));
    }

    #[test]
    fn work_areas_cleared_on_drop() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths =
            ProjectPaths::from_uploads_dir(&tmp.path().join("uploads"), "references.json").unwrap();
        paths.ensure_dirs().unwrap();
        write(&paths.staging_dir, "stale.pdf", "x");

        {
            let _areas = WorkAreas::claim(&paths).unwrap();
            assert_eq!(std::fs::read_dir(&paths.staging_dir).unwrap().count(), 0);
            write(&paths.extraction_dir, "a.tei.xml", "x");
            std::fs::create_dir(paths.extraction_dir.join("nested")).unwrap();
        }
        assert_eq!(std::fs::read_dir(&paths.extraction_dir).unwrap().count(), 0);
    }

    #[test]
    fn missing_input_directory_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let request = IngestRequest {
            pdf_directory: tmp.path().join("nope").join("uploads"),
        };
        struct NeverCalled;
        impl Extractor for NeverCalled {
            fn process(&self, _: &Path, _: &Path) -> ReferenceResult<()> {
                panic!("extractor must not run");
            }
            fn name(&self) -> &str {
                "never"
            }
        }
        let err = run_ingest(&request, &NeverCalled, &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, ReferenceError::InputDirectory { .. }));
    }
}
