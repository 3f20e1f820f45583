//! Shell-backed command executor

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::MeshError;
use crate::exec::{CommandExecutor, ExecOptions, ExecOutput};

/// Executes command strings through the system shell
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor;

impl ShellExecutor {
    pub fn new() -> Self {
        Self
    }

    #[cfg(unix)]
    fn shell_command(command: &str) -> Command {
        let mut cmd = Command::new("bash");
        cmd.args(["-c", command]);
        cmd
    }

    #[cfg(not(unix))]
    fn shell_command(command: &str) -> Command {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &str, options: &ExecOptions) -> Result<ExecOutput, MeshError> {
        debug!("Executing: {}", command);
        let started = Instant::now();

        let mut cmd = Self::shell_command(command);
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &options.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| MeshError::Exec(format!("Failed to spawn '{}': {}", command, e)))?;

        // Drain stdout line by line so callers can stream progress while the
        // command runs; stderr is collected whole.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let sink = options.on_output.clone();

        let stdout_task = tokio::spawn(async move {
            let mut collected = String::new();
            if let Some(pipe) = stdout_pipe {
                let mut lines = BufReader::new(pipe).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(sink) = &sink {
                        sink(&line);
                    }
                    collected.push_str(&line);
                    collected.push('\n');
                }
            }
            collected
        });

        let stderr_task = tokio::spawn(async move {
            let mut collected = String::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_string(&mut collected).await;
            }
            collected
        });

        let status = match options.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        "Command exceeded {}s timeout, killing: {}",
                        timeout.as_secs(),
                        command
                    );
                    let _ = child.kill().await;
                    return Err(MeshError::ExecTimeout(timeout.as_secs()));
                }
            },
            None => child.wait().await?,
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        Ok(ExecOutput {
            code: status.code().unwrap_or(-1),
            stdout,
            stderr,
            duration: started.elapsed(),
        })
    }
}
