//! Reference shelf: ingestion of uploaded PDFs into a flat JSON store.
//!
//! Each uploaded document becomes a [`Reference`] carrying bibliographic
//! metadata, its extracted text, page-tagged chunks, and a collision-free
//! citation key. The store is one JSON document per project under
//! `<project>/.storage/`.

pub mod chunker;
pub mod citation;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod model;
pub mod service;
pub mod status;
pub mod storage;

pub use citation::assign_citation_keys;
pub use error::{ReferenceError, ReferenceResult};
pub use ingest::{IngestOptions, run_ingest};
pub use model::{
    Author, Chunk, ChunkMetadata, IngestRequest, IngestResponse, IngestStatus, Reference,
    ReferencePatch,
};
pub use status::{emit_statuses, list_uploads};
pub use storage::JsonStorage;
