//! refshelf CLI: ingest uploaded PDFs into a project's reference store.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use refshelf::config::RefshelfConfig;
use refshelf::paths::{AppPaths, ProjectPaths};
use refshelf::references::extract::GrobidCommand;
use refshelf::references::ingest::{IngestOptions, IngestRequest, run_ingest};
use refshelf::references::model::{DeleteRequest, ReferencePatch, ResponseStatus};
use refshelf::references::{JsonStorage, ReferenceError, emit_statuses, list_uploads, service};

#[derive(Parser)]
#[command(name = "refshelf", version, about = "Reference shelf for uploaded PDFs")]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/refshelf/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every PDF in an uploads directory.
    Ingest {
        /// The project's uploads directory.
        uploads: PathBuf,

        /// Abort without writing if not done within this many seconds.
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Report the processing status of each uploaded file.
    Status {
        /// The project's uploads directory.
        uploads: PathBuf,
    },

    /// Show one stored reference.
    Show {
        /// The project's uploads directory.
        uploads: PathBuf,
        /// Reference ID.
        id: String,
    },

    /// Patch a reference's metadata.
    Update {
        /// The project's uploads directory.
        uploads: PathBuf,
        /// Reference ID.
        id: String,
        /// JSON object with any of: title, doi, published_date, authors (null clears).
        #[arg(long)]
        patch: String,
    },

    /// Delete references by ID, or all of them.
    Delete {
        /// The project's uploads directory.
        uploads: PathBuf,
        /// Reference IDs.
        ids: Vec<String>,
        /// Delete every reference in the store.
        #[arg(long)]
        all: bool,
    },

    /// Write a default config file.
    InitConfig,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppPaths::resolve()?.config_file(),
    };
    let config = RefshelfConfig::load_or_default(&config_path)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    match cli.command {
        Commands::Ingest {
            uploads,
            deadline_secs,
        } => {
            let extractor = GrobidCommand::from_config(&config.extractor);
            let options = IngestOptions {
                deadline: deadline_secs.map(|s| Instant::now() + Duration::from_secs(s)),
                ..IngestOptions::from_config(&config)
            };
            let request = IngestRequest {
                pdf_directory: uploads,
            };
            let response = run_ingest(&request, &extractor, &options)?;
            print_json(&response)?;
        }

        Commands::Status { uploads } => {
            let project = project(&uploads, &config)?;
            let files = list_uploads(&project.uploads_dir)?;
            let mut storage = JsonStorage::open(&project.store_file);
            print_json(&emit_statuses(&mut storage, &files))?;
        }

        Commands::Show { uploads, id } => {
            let project = project(&uploads, &config)?;
            let Some(reference) = service::get_reference(&project.store_file, &id)? else {
                return Err(ReferenceError::NotFound { id }.into());
            };
            print_json(&reference)?;
        }

        Commands::Update { uploads, id, patch } => {
            let project = project(&uploads, &config)?;
            let patch: ReferencePatch = serde_json::from_str(&patch).into_diagnostic()?;
            let response = service::update_reference(&project.store_file, &id, &patch);
            print_json(&response)?;
            exit_on_error(response.status);
        }

        Commands::Delete { uploads, ids, all } => {
            let project = project(&uploads, &config)?;
            let request = DeleteRequest {
                reference_ids: ids,
                all,
            };
            let response = service::delete_references(&project.store_file, &request);
            print_json(&response)?;
            exit_on_error(response.status);
        }

        Commands::InitConfig => {
            if config_path.exists() {
                println!("Config already exists at {}", config_path.display());
            } else {
                RefshelfConfig::default().save(&config_path)?;
                println!("Wrote default config to {}", config_path.display());
            }
        }
    }

    Ok(())
}

fn project(uploads: &Path, config: &RefshelfConfig) -> Result<ProjectPaths> {
    Ok(ProjectPaths::from_uploads_dir(uploads, &config.storage.file_name)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn exit_on_error(status: ResponseStatus) {
    if status == ResponseStatus::Error {
        std::process::exit(1);
    }
}
