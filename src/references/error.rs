//! Rich diagnostic error types for the reference store and ingestion pipeline.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from reference store and ingestion operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ReferenceError {
    #[error("reference not found: \"{id}\"")]
    #[diagnostic(
        code(refshelf::references::not_found),
        help(
            "No reference with this ID exists in the store. \
             Check the project's status with `refshelf status <uploads>`."
        )
    )]
    NotFound { id: String },

    #[error("invalid request: {message}")]
    #[diagnostic(
        code(refshelf::references::invalid_request),
        help("The request is missing a required parameter or contains an invalid value.")
    )]
    InvalidRequest { message: String },

    #[error("reference store error at {path}: {message}")]
    #[diagnostic(
        code(refshelf::references::storage),
        help(
            "The reference store could not be read or written. Check that the file \
             exists, is a JSON array of references, and that the directory is writable."
        )
    )]
    Storage { path: String, message: String },

    #[error("input directory {path}: {message}")]
    #[diagnostic(
        code(refshelf::references::input_directory),
        help("Point the ingestion request at an existing directory of uploaded PDFs.")
    )]
    InputDirectory { path: String, message: String },

    #[error("extraction service unavailable: {message}")]
    #[diagnostic(
        code(refshelf::references::extraction_unavailable),
        help(
            "The extraction command could not be run or exited with an error. \
             Check the `[extractor]` section of the config and that the GROBID \
             service is reachable."
        )
    )]
    ExtractionUnavailable { message: String },

    #[error("malformed extraction artifact {path}: {message}")]
    #[diagnostic(
        code(refshelf::references::malformed_artifact),
        help(
            "The extraction output for this document could not be read as TEI XML. \
             The document is kept with status `failure` and raw-text contents."
        )
    )]
    MalformedArtifact { path: String, message: String },

    #[error("ingestion deadline exceeded before commit")]
    #[diagnostic(
        code(refshelf::references::deadline_exceeded),
        help("Nothing was written to the store. Retry with a longer deadline or a smaller batch.")
    )]
    DeadlineExceeded,

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(refshelf::references::io),
        help("A filesystem operation failed. Check file paths and permissions.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for ReferenceError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}

/// Convenience alias for reference operation results.
pub type ReferenceResult<T> = std::result::Result<T, ReferenceError>;
