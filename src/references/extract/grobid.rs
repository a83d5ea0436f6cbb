//! GROBID extraction collaborator, driven through its command-line client.
//!
//! The command is configurable; `{input}` and `{output}` in the argument list
//! are replaced with the staging and output directories.

use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::references::error::{ReferenceError, ReferenceResult};
use crate::references::extract::Extractor;

/// Longest stderr excerpt carried into an error message.
const MAX_STDERR: usize = 2000;

/// How to invoke the extraction command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Program to run.
    #[serde(default = "default_command")]
    pub command: String,
    /// Arguments; `{input}` and `{output}` are substituted.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Kill the command after this many seconds. No limit when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_command() -> String {
    "grobid_client".into()
}

fn default_args() -> Vec<String> {
    ["--input", "{input}", "--output", "{output}", "processFulltextDocument"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            timeout_secs: None,
        }
    }
}

/// Runs the GROBID client over a staged directory.
pub struct GrobidCommand {
    config: ExtractorConfig,
}

impl GrobidCommand {
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn render_args(&self, input_dir: &Path, output_dir: &Path) -> Vec<String> {
        let input = input_dir.display().to_string();
        let output = output_dir.display().to_string();
        self.config
            .args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }

    fn unavailable(&self, message: impl std::fmt::Display) -> ReferenceError {
        ReferenceError::ExtractionUnavailable {
            message: format!("{}: {message}", self.config.command),
        }
    }

    fn wait(&self, child: &mut std::process::Child) -> ReferenceResult<ExitStatus> {
        let Some(secs) = self.config.timeout_secs else {
            return child.wait().map_err(|e| self.unavailable(format!("wait: {e}")));
        };

        let deadline = Instant::now() + Duration::from_secs(secs);
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.unavailable(format!("timed out after {secs}s")));
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(100)),
                Err(e) => return Err(self.unavailable(format!("wait: {e}"))),
            }
        }
    }
}

impl Extractor for GrobidCommand {
    fn name(&self) -> &str {
        &self.config.command
    }

    fn process(&self, input_dir: &Path, output_dir: &Path) -> ReferenceResult<()> {
        let args = self.render_args(input_dir, output_dir);
        tracing::info!(command = %self.config.command, ?args, "running extraction");

        let mut child = Command::new(&self.config.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.unavailable(format!("spawn: {e}")))?;

        // A full stderr pipe blocks the child; drain it while waiting.
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });

        let status = self.wait(&mut child)?;
        let stderr = stderr
            .and_then(|handle| handle.join().ok())
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default();

        if !status.success() {
            let excerpt: String = stderr.trim().chars().take(MAX_STDERR).collect();
            return Err(self.unavailable(format!("exited with {status}: {excerpt}")));
        }

        Ok(())
    }
}
