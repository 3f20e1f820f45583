//! Mesh configuration reading and validation

use serde_json::Value;
use tracing::debug;

use crate::errors::MeshError;
use crate::filesys::file::File;
use crate::models::mesh::MeshSource;

/// A validated mesh configuration document
#[derive(Debug, Clone)]
pub struct MeshConfig {
    raw: Value,
}

impl MeshConfig {
    /// Get the raw configuration document
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Get the upstream sources declared under `meshConfig.sources`.
    ///
    /// Sources with shapes this tool does not model are skipped rather
    /// than rejected; the CLI is the authority on full validation.
    pub fn sources(&self) -> Vec<MeshSource> {
        self.raw
            .get("meshConfig")
            .and_then(|config| config.get("sources"))
            .and_then(|sources| sources.as_array())
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|source| serde_json::from_value(source.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Read and validate the mesh configuration file.
///
/// Fails when the file is missing, is not valid JSON, or parses to anything
/// other than a JSON object. Always reads from disk so that edits between
/// deploy attempts are picked up.
pub async fn read_mesh_config(config_file: &File) -> Result<MeshConfig, MeshError> {
    if !config_file.exists().await {
        return Err(MeshError::Config(format!(
            "Mesh configuration not found at {}",
            config_file.path().display()
        )));
    }

    let contents = config_file
        .read_string()
        .await
        .map_err(|e| MeshError::Config(format!("Invalid mesh.json: {}", e)))?;

    let raw: Value = serde_json::from_str(&contents)
        .map_err(|e| MeshError::Config(format!("Invalid mesh.json: {}", e)))?;

    if !raw.is_object() {
        return Err(MeshError::Config(
            "Invalid mesh.json: expected a JSON object".to_string(),
        ));
    }

    debug!("Mesh configuration loaded from {}", config_file.path().display());
    Ok(MeshConfig { raw })
}
