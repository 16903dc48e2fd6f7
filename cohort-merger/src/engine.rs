//! Child-process wrapper around the external merge engine.
//!
//! The engine does the actual parallel work; this wrapper launches it,
//! streams its output, and reports its exit status. Both output pipes are
//! drained concurrently so a child filling one pipe while the orchestrator
//! reads the other cannot stall.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{UpdateError, UpdateResult};

/// Handle to the external merge-engine binary.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    binary: PathBuf,
    annotations_folder: PathBuf,
    suppressed_diagnostics: Vec<String>,
}

impl MergeEngine {
    /// Creates a new engine handle.
    pub fn new(
        binary: PathBuf,
        annotations_folder: PathBuf,
        suppressed_diagnostics: Vec<String>,
    ) -> Self {
        Self {
            binary,
            annotations_folder,
            suppressed_diagnostics,
        }
    }

    /// Runs one merge pass over `manifest` with the given task graph.
    ///
    /// A non-zero exit is fatal; the run is not retried.
    pub async fn run(&self, manifest: &Path, task_graph: &Path) -> UpdateResult<()> {
        let mut command = Command::new(&self.binary);
        command
            .arg("run")
            .arg("--annotation-folder")
            .arg(&self.annotations_folder)
            .arg("--manifest")
            .arg(manifest)
            .arg("-c")
            .arg(task_graph);

        self.execute(command, format!("run --manifest {}", manifest.display()))
            .await
    }

    /// Triggers the engine's post-write optimization pass on `artifact`.
    pub async fn precompute(&self, artifact: &Path) -> UpdateResult<()> {
        let mut command = Command::new(&self.binary);
        command.arg("precompute").arg(artifact);

        self.execute(command, format!("precompute {}", artifact.display()))
            .await
    }

    /// Captures the engine's schema dump for `source` into `out`.
    ///
    /// `source` may address a logical view of an artifact (`<path>:2`), so it
    /// is passed as a plain string.
    pub async fn schema(&self, source: &str, out: &Path) -> UpdateResult<()> {
        let output = Command::new(&self.binary)
            .arg("schema")
            .arg(source)
            .output()
            .await?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            error!(source, code, "engine schema dump failed");
            return Err(UpdateError::EngineExecution {
                command: format!("schema {source}"),
                code,
            });
        }

        fs::write(out, &output.stdout)?;
        info!(source, out = %out.display(), "captured schema dump");
        Ok(())
    }

    async fn execute(&self, mut command: Command, label: String) -> UpdateResult<()> {
        info!(command = %label, engine = %self.binary.display(), "launching merge engine");

        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command.spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("engine stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("engine stderr was not captured"))?;

        let stdout_task = forward_stdout(stdout);
        let stderr_task = forward_stderr(stderr, self.suppressed_diagnostics.clone());

        let status = child.wait().await?;

        // Join the drain tasks so trailing output lands before the verdict.
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            error!(command = %label, code, "merge engine failed");
            return Err(UpdateError::EngineExecution {
                command: label,
                code,
            });
        }

        info!(command = %label, "merge engine finished");
        Ok(())
    }
}

fn forward_stdout(stdout: impl AsyncRead + Unpin + Send + 'static) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            info!(target: "engine", "{line}");
        }
    })
}

fn forward_stderr(
    stderr: impl AsyncRead + Unpin + Send + 'static,
    suppressed: Vec<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if suppressed.iter().any(|fragment| line.contains(fragment)) {
                continue;
            }
            warn!(target: "engine", "{line}");
        }
    })
}
