//! Path resolution for refshelf.
//!
//! Provides `AppPaths` (XDG config location) and `ProjectPaths` (the working
//! areas of one project, derived from its uploads directory).

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(refshelf::paths::no_home),
        help("Set the HOME environment variable or pass --config explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(refshelf::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot derive a project from uploads directory \"{path}\"")]
    #[diagnostic(
        code(refshelf::paths::no_project),
        help(
            "The uploads directory must live inside a project directory, \
             e.g. `my-project/uploads`."
        )
    )]
    NoProject { path: String },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global XDG-compliant directories.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// `$XDG_CONFIG_HOME/refshelf/`
    pub config_dir: PathBuf,
}

impl AppPaths {
    /// Resolve directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .map_err(|_| PathError::NoHome)?,
        }
        .join("refshelf");

        Ok(Self { config_dir })
    }

    /// `config_dir/config.toml`
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

/// Working areas of one project.
///
/// ```text
/// <root>/uploads/                    uploaded PDFs (input)
/// <root>/.staging/                   copies made for one batch
/// <root>/.grobid/                    extraction artifacts for one batch
/// <root>/.storage/references.json    the reference store
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    /// Project name: the root directory's name.
    pub name: String,
    pub root: PathBuf,
    pub uploads_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub extraction_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub store_file: PathBuf,
}

impl ProjectPaths {
    /// Derive the project layout from its uploads directory. The project root
    /// is the uploads directory's parent.
    pub fn from_uploads_dir(uploads_dir: &Path, store_file_name: &str) -> PathResult<Self> {
        let no_project = || PathError::NoProject {
            path: uploads_dir.display().to_string(),
        };
        let uploads_dir = std::path::absolute(uploads_dir).map_err(|_| no_project())?;
        let root = uploads_dir.parent().ok_or_else(no_project)?.to_path_buf();
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(no_project)?
            .to_string();

        let storage_dir = root.join(".storage");
        Ok(Self {
            name,
            staging_dir: root.join(".staging"),
            extraction_dir: root.join(".grobid"),
            store_file: storage_dir.join(store_file_name),
            storage_dir,
            uploads_dir,
            root,
        })
    }

    /// Create the working directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [&self.staging_dir, &self.extraction_dir, &self.storage_dir] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }
}
