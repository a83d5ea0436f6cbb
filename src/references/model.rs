//! Core data types for the reference store.
//!
//! A [`Reference`] is one ingested document: bibliographic metadata, the full
//! extracted text, and the chunks derived from that text. Every type here
//! round-trips through the persisted JSON store, so field names are part of
//! the on-disk format.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing state of an ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Processing,
    Complete,
    Failure,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document author. Only `full_name` is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub full_name: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub surname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Author {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            given_name: None,
            surname: None,
            email: None,
        }
    }

    /// Lower-cased final whitespace-delimited token of the full name, reduced
    /// to alphanumeric characters. `None` when nothing usable remains.
    pub fn last_name_key(&self) -> Option<String> {
        let token = self.full_name.split_whitespace().last()?;
        let key: String = token
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        if key.is_empty() { None } else { Some(key) }
    }
}

/// Location of a chunk within its source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_filename: String,
    /// 1-based page number.
    pub page_num: u32,
}

/// A page- or section-sized slice of a reference's extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A single ingested document record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub source_filename: String,
    pub status: IngestStatus,
    #[serde(default)]
    pub citation_key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub published_date: Option<NaiveDate>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub contents: String,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

impl Reference {
    /// A fresh record in the `PROCESSING` state with a newly generated id.
    pub fn new(source_filename: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_filename: source_filename.into(),
            status: IngestStatus::Processing,
            citation_key: None,
            title: None,
            doi: None,
            published_date: None,
            authors: Vec::new(),
            contents: String::new(),
            chunks: Vec::new(),
        }
    }

    pub fn publication_year(&self) -> Option<i32> {
        self.published_date.map(|d| d.year())
    }

    /// Apply the fields present in a patch; an explicit `null` clears the
    /// field. Identity, status, text and citation key are never touched.
    pub fn apply_patch(&mut self, patch: &ReferencePatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(doi) = &patch.doi {
            self.doi = doi.clone();
        }
        if let Some(date) = patch.published_date {
            self.published_date = date;
        }
        if let Some(authors) = &patch.authors {
            self.authors = authors.clone();
        }
    }
}

/// Field-level update sent by a client that edited a reference.
///
/// An absent field is left alone; `null` clears it (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferencePatch {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub doi: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<Author>>,
}

/// Any value that is present, `null` included, becomes `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ReferencePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.doi.is_none()
            && self.published_date.is_none()
            && self.authors.is_none()
    }
}

/// Overall outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Outcome of an update or delete, with a message on error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResponse {
    pub status: ResponseStatus,
    pub message: String,
}

impl OperationResponse {
    pub fn ok() -> Self {
        Self {
            status: ResponseStatus::Ok,
            message: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
        }
    }
}

/// Request to delete references by id, or all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub reference_ids: Vec<String>,
    #[serde(default)]
    pub all: bool,
}

/// Processing status of one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceStatus {
    pub source_filename: String,
    pub status: IngestStatus,
}

/// Per-file processing statuses for a project's uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: ResponseStatus,
    pub reference_statuses: Vec<ReferenceStatus>,
}

/// Request to ingest every PDF in a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub pdf_directory: PathBuf,
}

/// Result of one ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub project_name: String,
    pub references: Vec<Reference>,
}
