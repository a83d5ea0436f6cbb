//! Persistent reference store backed by a single JSON document.
//!
//! The file holds a JSON array of [`Reference`] objects and is rewritten
//! wholesale on every mutation. Callers load a fresh snapshot, decide, and
//! save the full result; there is no locking, so concurrent writers lose
//! updates.

use std::path::{Path, PathBuf};

use crate::references::error::{ReferenceError, ReferenceResult};
use crate::references::model::{Chunk, Reference, ReferencePatch};

/// Chunk texts across all references, in store order, for relevance ranking.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    chunks: Vec<Chunk>,
    texts: Vec<String>,
    tokenized: Vec<Vec<String>>,
}

impl Corpus {
    /// Build the corpus from scratch. Never updated incrementally.
    pub fn build(references: &[Reference]) -> Self {
        let mut corpus = Self::default();
        for chunk in references.iter().flat_map(|r| &r.chunks) {
            corpus.texts.push(chunk.text.clone());
            corpus.tokenized.push(
                chunk
                    .text
                    .to_lowercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            );
            corpus.chunks.push(chunk.clone());
        }
        corpus
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Raw chunk texts, parallel to [`Corpus::chunks`].
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    /// Lower-cased whitespace tokens per chunk, parallel to [`Corpus::chunks`].
    pub fn tokenized(&self) -> &[Vec<String>] {
        &self.tokenized
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// In-memory snapshot of the reference store plus its backing file.
pub struct JsonStorage {
    path: PathBuf,
    references: Vec<Reference>,
    corpus: Corpus,
}

impl JsonStorage {
    /// Bind to a store file. Nothing is read until [`JsonStorage::load`].
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            references: Vec::new(),
            corpus: Corpus::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replace the in-memory snapshot with the contents of the backing file.
    ///
    /// Fails if the file is missing, unreadable, or not a JSON array of
    /// complete references. On failure the previous snapshot is kept.
    pub fn load(&mut self) -> ReferenceResult<()> {
        let data = std::fs::read_to_string(&self.path).map_err(|e| self.storage_error("read", e))?;
        let references: Vec<Reference> =
            serde_json::from_str(&data).map_err(|e| self.storage_error("parse", e))?;

        tracing::debug!(
            path = %self.path.display(),
            count = references.len(),
            "loaded reference store"
        );
        self.set_references(references);
        Ok(())
    }

    /// Like [`JsonStorage::load`], but a missing file yields an empty snapshot.
    pub fn load_or_empty(&mut self) -> ReferenceResult<()> {
        if self.exists() {
            self.load()
        } else {
            self.set_references(Vec::new());
            Ok(())
        }
    }

    /// Write the full snapshot to the backing file.
    ///
    /// The JSON is written to a sibling temp file and renamed over the store,
    /// so readers never observe a half-written document.
    pub fn save(&self) -> ReferenceResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.storage_error("create dir", e))?;
        }
        let json = serde_json::to_string_pretty(&self.references)
            .map_err(|e| self.storage_error("serialize", e))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| self.storage_error("write", e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.storage_error("replace", e))?;

        tracing::debug!(
            path = %self.path.display(),
            count = self.references.len(),
            "saved reference store"
        );
        Ok(())
    }

    /// All references in the snapshot, in store order.
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Citation keys already assigned in this snapshot, in store order.
    pub fn citation_keys(&self) -> Vec<String> {
        self.references
            .iter()
            .filter_map(|r| r.citation_key.clone())
            .collect()
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Look up a reference by id.
    pub fn get_reference(&self, id: &str) -> Option<&Reference> {
        self.references.iter().find(|r| r.id == id)
    }

    /// Append references to the in-memory snapshot. Call [`JsonStorage::save`]
    /// to persist.
    pub fn extend(&mut self, references: impl IntoIterator<Item = Reference>) {
        self.references.extend(references);
        self.corpus = Corpus::build(&self.references);
    }

    /// Apply a patch to one reference and save the whole snapshot.
    ///
    /// If the save fails the snapshot keeps the unpatched reference.
    pub fn update(&mut self, id: &str, patch: &ReferencePatch) -> ReferenceResult<()> {
        let Some(index) = self.references.iter().position(|r| r.id == id) else {
            tracing::error!(id, "unable to update reference: not found in storage");
            return Err(ReferenceError::NotFound { id: id.into() });
        };

        tracing::info!(id, ?patch, "updating reference");
        let mut patched = self.references[index].clone();
        patched.apply_patch(patch);
        let previous = std::mem::replace(&mut self.references[index], patched);
        if let Err(e) = self.save() {
            self.references[index] = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Delete the named references, or all of them, and save the snapshot.
    ///
    /// Nothing is removed or written if the request names no ids without
    /// `all`, or if any named id is absent. If the save fails the snapshot is
    /// left as it was. Returns the number removed.
    pub fn delete(&mut self, ids: &[String], all: bool) -> ReferenceResult<usize> {
        if ids.is_empty() && !all {
            return Err(ReferenceError::InvalidRequest {
                message: "delete requires reference ids or the `all` flag".into(),
            });
        }

        if !all {
            if let Some(missing) = ids.iter().find(|id| self.get_reference(id).is_none()) {
                tracing::warn!(id = %missing, "unable to delete reference: not found in storage");
                return Err(ReferenceError::NotFound {
                    id: missing.clone(),
                });
            }
        }

        let kept: Vec<Reference> = if all {
            Vec::new()
        } else {
            self.references
                .iter()
                .filter(|r| !ids.contains(&r.id))
                .cloned()
                .collect()
        };
        let removed = self.references.len() - kept.len();
        let previous = std::mem::replace(&mut self.references, kept);
        if let Err(e) = self.save() {
            self.references = previous;
            return Err(e);
        }
        self.corpus = Corpus::build(&self.references);

        Ok(removed)
    }

    fn set_references(&mut self, references: Vec<Reference>) {
        self.corpus = Corpus::build(&references);
        self.references = references;
    }

    fn storage_error(&self, action: &str, e: impl std::fmt::Display) -> ReferenceError {
        ReferenceError::Storage {
            path: self.path.display().to_string(),
            message: format!("{action}: {e}"),
        }
    }
}
