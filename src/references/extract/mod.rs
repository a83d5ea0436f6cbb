//! Extraction collaborator contract and output classification.
//!
//! An [`Extractor`] turns a directory of PDFs into one artifact per input
//! file in an output directory:
//!
//! - `<stem>.grobid.tei.xml` or `<stem>.tei.xml`: structured metadata and text
//! - `<stem>_<errorcode>.txt`: the extractor gave up on that file
//!
//! [`ArtifactIndex`] maps each staged file back to its artifact.

pub mod grobid;
pub mod pdf;
pub mod tei;

use std::path::{Path, PathBuf};

use crate::references::error::ReferenceResult;

pub use grobid::{ExtractorConfig, GrobidCommand};
pub use tei::{TeiDocument, parse_tei};

/// External service that converts staged PDFs into extraction artifacts.
pub trait Extractor {
    /// Process every file in `input_dir`, writing artifacts to `output_dir`.
    ///
    /// An error means the service could not be reached or run at all; it is
    /// fatal to the whole batch. Per-file failures are reported through
    /// failure-marker artifacts instead.
    fn process(&self, input_dir: &Path, output_dir: &Path) -> ReferenceResult<()>;

    /// Short name for diagnostics.
    fn name(&self) -> &str;
}

/// What the extractor produced for one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Structured TEI output.
    Tei(PathBuf),
    /// Failure marker with the extractor's error code.
    FailureMarker { path: PathBuf, code: String },
    /// No artifact at all.
    Missing,
}

/// Listing of an extraction output directory.
pub struct ArtifactIndex {
    dir: PathBuf,
    names: Vec<String>,
}

const TEI_SUFFIXES: [&str; 2] = [".grobid.tei.xml", ".tei.xml"];

impl ArtifactIndex {
    /// List the output directory once.
    pub fn scan(dir: &Path) -> ReferenceResult<Self> {
        let mut names: Vec<String> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Find the artifact written for the input file with this stem.
    pub fn classify(&self, stem: &str) -> Artifact {
        for suffix in TEI_SUFFIXES {
            let name = format!("{stem}{suffix}");
            if self.names.contains(&name) {
                return Artifact::Tei(self.dir.join(name));
            }
        }

        let prefix = format!("{stem}_");
        self.names
            .iter()
            .find_map(|name| {
                let code = name.strip_prefix(&prefix)?.strip_suffix(".txt")?;
                (!code.is_empty() && code.chars().all(|c| c.is_ascii_digit())).then(|| {
                    Artifact::FailureMarker {
                        path: self.dir.join(name),
                        code: code.to_string(),
                    }
                })
            })
            .unwrap_or(Artifact::Missing)
    }
}

/// File stem used to match artifacts (`paper.pdf` → `paper`).
pub fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Whether a path names a PDF by extension.
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
