//! Command execution

pub mod shell;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::MeshError;

/// Callback receiving each line of live command output
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Options for a single command execution
#[derive(Clone, Default)]
pub struct ExecOptions {
    /// Working directory for the spawned process
    pub cwd: Option<PathBuf>,

    /// Kill the process and fail when it runs longer than this
    pub timeout: Option<Duration>,

    /// Extra environment variables for the child process
    pub env: Vec<(String, String)>,

    /// Callback invoked with each stdout line as it arrives
    pub on_output: Option<OutputSink>,
}

impl std::fmt::Debug for ExecOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecOptions")
            .field("cwd", &self.cwd)
            .field("timeout", &self.timeout)
            .field("env", &self.env)
            .field("on_output", &self.on_output.is_some())
            .finish()
    }
}

/// Outcome of a completed command
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Process exit code (-1 when terminated by a signal)
    pub code: i32,

    /// Captured standard output
    pub stdout: String,

    /// Captured standard error
    pub stderr: String,

    /// Wall-clock run time
    pub duration: Duration,
}

impl ExecOutput {
    /// True when the process exited with code 0
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Command executor trait.
///
/// A non-zero exit code is a normal `ExecOutput`; only process-level
/// problems (spawn failure, timeout) surface as errors.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command string to completion
    async fn execute(&self, command: &str, options: &ExecOptions) -> Result<ExecOutput, MeshError>;
}
