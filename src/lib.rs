// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # refshelf
//!
//! Batch ingestion of uploaded PDF documents into a flat JSON reference store.
//!
//! ## Architecture
//!
//! - **Store** (`references::storage`): whole-snapshot JSON document of references
//! - **Citation keys** (`references::citation`): deterministic, collision-free `author+year` keys
//! - **Ingestion** (`references::ingest`): stage → extract → materialize → key → persist → clean up
//! - **Status** (`references::status`): reconciles the uploads directory against the store
//!
//! ## Library usage
//!
//! ```no_run
//! use refshelf::config::RefshelfConfig;
//! use refshelf::references::extract::GrobidCommand;
//! use refshelf::references::ingest::{IngestOptions, IngestRequest, run_ingest};
//!
//! let config = RefshelfConfig::default();
//! let extractor = GrobidCommand::from_config(&config.extractor);
//! let request = IngestRequest {
//!     pdf_directory: "project/uploads".into(),
//! };
//! let response = run_ingest(&request, &extractor, &IngestOptions::from_config(&config)).unwrap();
//! println!("{} new references", response.references.len());
//! ```

pub mod config;
pub mod paths;
pub mod references;
