//! Mesh deletion

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::errors::MeshError;
use crate::exec::{CommandExecutor, ExecOptions};

/// Validate a mesh ID before it is ever placed on a command line.
///
/// Only ASCII alphanumerics, hyphens, and underscores are accepted;
/// anything else (shell metacharacters included) is rejected outright.
pub fn validate_mesh_id(mesh_id: &str) -> Result<(), MeshError> {
    if mesh_id.is_empty() {
        return Err(MeshError::Validation(
            "Mesh ID must not be empty".to_string(),
        ));
    }

    if !mesh_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(MeshError::Validation(format!(
            "Mesh ID '{}' contains characters outside [A-Za-z0-9_-]",
            mesh_id
        )));
    }

    Ok(())
}

/// Issues best-effort mesh delete commands
pub struct MeshDeleter {
    executor: Arc<dyn CommandExecutor>,
    aio_command: String,
    command_timeout: Option<Duration>,
    cwd: Option<PathBuf>,
}

impl MeshDeleter {
    /// Create a deleter with default options
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            aio_command: "aio".to_string(),
            command_timeout: Some(Duration::from_secs(60)),
            cwd: None,
        }
    }

    /// Set the Adobe I/O CLI command
    pub fn with_aio_command(mut self, aio_command: impl Into<String>) -> Self {
        self.aio_command = aio_command.into();
        self
    }

    /// Set the working directory for the delete command
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Delete the given mesh. Returns `true` on success; every failure
    /// path (validation included) logs and returns `false`, since deletion
    /// is a cleanup step callers do not branch on.
    pub async fn delete(&self, mesh_id: &str) -> bool {
        match self.delete_impl(mesh_id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                error!("Mesh delete failed: {}", e);
                false
            }
        }
    }

    async fn delete_impl(&self, mesh_id: &str) -> Result<bool, MeshError> {
        // Validated before any command string is assembled
        validate_mesh_id(mesh_id)?;

        let command = format!("{} api-mesh:delete {} -c", self.aio_command, mesh_id);
        let options = ExecOptions {
            cwd: self.cwd.clone(),
            timeout: self.command_timeout,
            ..Default::default()
        };

        let output = self.executor.execute(&command, &options).await?;
        if output.success() {
            info!("Mesh {} deleted", mesh_id);
            Ok(true)
        } else {
            warn!(
                "Mesh delete exited with code {}: {}",
                output.code,
                output.stderr.trim()
            );
            Ok(false)
        }
    }
}
