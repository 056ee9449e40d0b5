//! Compiler invocation: runs the external compiler as a child process.
//!
//! The compiler takes a source path as its last argument and prints one
//! JSON document on stdout. Launch problems and non-zero exits surface as
//! [`CompileError`]; interpreting stdout is left to the caller.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tsn_types::CompilerConfig;

/// Raw output of a successful compiler run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("compiler '{command}' not found in PATH")]
    NotFound {
        command: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to launch compiler {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error while running compiler: {0}")]
    Io(#[from] std::io::Error),
    #[error("compiler exited with {status}: {}", .stderr.trim())]
    Exit { status: ExitStatus, stderr: String },
    #[error("compiler did not finish within {}s", .0.as_secs())]
    TimedOut(Duration),
}

/// Something that can compile one source file.
///
/// The returned future resolves exactly once. Implementations must not
/// panic; every failure is a [`CompileError`].
pub trait Compiler: Send + Sync + 'static {
    fn compile(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<CompilerOutput, CompileError>> + Send;
}

/// Runs the configured compiler executable.
#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    config: CompilerConfig,
}

impl ExternalCompiler {
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs())
    }
}

impl Compiler for ExternalCompiler {
    async fn compile(&self, path: &Path) -> Result<CompilerOutput, CompileError> {
        let command = self.config.command();
        let program = which::which(command).map_err(|source| CompileError::NotFound {
            command: command.to_string(),
            source,
        })?;

        let mut cmd = Command::new(&program);
        cmd.args(self.config.args())
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(
            program = %program.display(),
            path = %path.display(),
            "Running compiler"
        );

        let child = cmd.spawn().map_err(|source| CompileError::Spawn {
            program: program.clone(),
            source,
        })?;

        // Dropping the pending wait on timeout drops the child, which kills it.
        let timeout = self.timeout();
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    path = %path.display(),
                    timeout_secs = timeout.as_secs(),
                    "Compiler timed out, killed"
                );
                return Err(CompileError::TimedOut(timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(CompileError::Exit {
                status: output.status,
                stderr,
            });
        }

        tracing::debug!(
            path = %path.display(),
            stdout_bytes = stdout.len(),
            "Compiler finished"
        );
        Ok(CompilerOutput { stdout, stderr })
    }
}
