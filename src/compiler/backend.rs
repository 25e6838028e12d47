// src/compiler/backend.rs
// Compiler process backends

use super::program::Invocation;
use crate::error::{EmitError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Buffered lines between a watch compiler and its interceptors
const WATCH_CHANNEL_CAPACITY: usize = 256;

#[cfg(windows)]
const TSC_BIN: &str = "tsc.cmd";
#[cfg(not(windows))]
const TSC_BIN: &str = "tsc";

/// Captured result of a run-to-completion compilation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CompilerOutput {
    /// Exit codes 0-2 mean success, or diagnostics with or without outputs;
    /// diagnostics are the bundler's business, not ours.
    pub fn completed(&self) -> bool {
        matches!(self.status, Some(0..=2))
    }
}

/// Output lines of a running watch compiler; closes when the process exits
pub type WatchLines = mpsc::Receiver<String>;

/// The external type-checking compiler
#[async_trait]
pub trait CompilerBackend: Send + Sync {
    /// Run one compilation to completion
    async fn run(&self, invocation: &Invocation) -> Result<CompilerOutput>;

    /// Start a persistent watch compilation and stream its stdout
    async fn spawn_watch(&self, invocation: &Invocation) -> Result<WatchLines>;
}

/// Drives the TypeScript compiler executable as a child process
#[derive(Debug, Clone)]
pub struct TscBackend {
    program: PathBuf,
}

impl TscBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Prefer the project's own `node_modules/.bin/tsc`, nearest first, then
    /// whatever `tsc` is on `PATH`.
    pub fn locate(cwd: &Path) -> Self {
        let local = cwd
            .ancestors()
            .map(|dir| dir.join("node_modules").join(".bin").join(TSC_BIN))
            .find(|candidate| candidate.is_file());

        match local {
            Some(path) => {
                debug!(tsc = %path.display(), "Using project-local compiler");
                Self::new(path)
            }
            None => Self::new(TSC_BIN),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(invocation.args())
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self) -> impl FnOnce(std::io::Error) -> EmitError + '_ {
        move |source| EmitError::CompilerSpawn {
            program: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl CompilerBackend for TscBackend {
    async fn run(&self, invocation: &Invocation) -> Result<CompilerOutput> {
        debug!(
            tsc = %self.program.display(),
            args = ?invocation.args(),
            "Running compiler"
        );
        let output = self
            .command(invocation)
            .output()
            .await
            .map_err(self.spawn_error())?;

        Ok(CompilerOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn spawn_watch(&self, invocation: &Invocation) -> Result<WatchLines> {
        info!(
            tsc = %self.program.display(),
            project = %invocation.project_file.display(),
            "Starting watch compiler"
        );
        let mut child = self.command(invocation).spawn().map_err(self.spawn_error())?;

        let (tx, rx) = mpsc::channel(WATCH_CHANNEL_CAPACITY);
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(line = %line, "Watch compiler stderr");
                }
            });
        }

        tokio::spawn(async move {
            let mut receiver_gone = false;
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => {
                            if tx.send(line).await.is_err() {
                                receiver_gone = true;
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            warn!(error = %e, "Failed to read watch compiler output");
                            break;
                        }
                    }
                }
            }

            if receiver_gone {
                debug!("Watch session dropped, stopping compiler");
                let _ = child.kill().await;
                return;
            }

            match child.wait().await {
                Ok(status) => warn!(status = %status, "Watch compiler exited"),
                Err(e) => warn!(error = %e, "Failed to wait for watch compiler"),
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::program::ProgramKind;
    use tempfile::TempDir;

    #[test]
    fn test_completed_exit_codes() {
        for (status, completed) in [(Some(0), true), (Some(2), true), (Some(3), false), (None, false)] {
            let output = CompilerOutput {
                status,
                ..Default::default()
            };
            assert_eq!(output.completed(), completed, "status {:?}", status);
        }
    }

    #[test]
    fn test_locate_prefers_node_modules() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("node_modules/.bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join(TSC_BIN), "").unwrap();
        let nested = dir.path().join("packages/app");
        std::fs::create_dir_all(&nested).unwrap();

        let backend = TscBackend::locate(&nested);
        assert_eq!(backend.program(), bin.join(TSC_BIN));
    }

    #[test]
    fn test_locate_falls_back_to_path() {
        let dir = TempDir::new().unwrap();
        assert_eq!(TscBackend::locate(dir.path()).program(), Path::new(TSC_BIN));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let backend = TscBackend::new(dir.path().join("no-such-tsc"));
        let invocation = Invocation {
            cwd: dir.path().to_path_buf(),
            project_file: dir.path().join("tsconfig.json"),
            kind: ProgramKind::OneShot,
        };

        let err = backend.run(&invocation).await.unwrap_err();
        assert!(matches!(err, EmitError::CompilerSpawn { .. }));
    }
}
