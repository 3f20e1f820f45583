//! Error types for meshctl

use thiserror::Error;

/// Main error type for meshctl
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Mesh configuration problems. Messages arrive fully formed so user
    /// surfaces can match on the leading text ("Invalid mesh.json: ...",
    /// "Mesh configuration not found at ...").
    #[error("{0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Command execution error: {0}")]
    Exec(String),

    #[error("Command timed out after {0} seconds")]
    ExecTimeout(u64),

    #[error("Deployment error: {0}")]
    Deploy(String),

    #[error("Settings error: {0}")]
    Settings(String),
}
