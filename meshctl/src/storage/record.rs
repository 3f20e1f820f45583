//! Deployment record management

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::MeshError;
use crate::filesys::file::File;

/// Record of the last verified deployment, stored locally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRecord {
    /// Mesh ID reported by the CLI
    pub mesh_id: String,

    /// Public GraphQL endpoint
    pub endpoint: String,

    /// Content hash of mesh.json plus resolver and schema sources at
    /// deploy time; absent when it could not be computed
    pub source_hash: Option<String>,

    /// Mesh-relevant environment variables at deploy time
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,

    /// When the deployment was verified
    pub deployed_at: DateTime<Utc>,
}

impl DeployRecord {
    /// Create a record stamped with the current time
    pub fn new(
        mesh_id: String,
        endpoint: String,
        source_hash: Option<String>,
        env_vars: BTreeMap<String, String>,
    ) -> Self {
        Self {
            mesh_id,
            endpoint,
            source_hash,
            env_vars,
            deployed_at: Utc::now(),
        }
    }
}

/// Load the deploy record, when one exists
pub async fn load_record(record_file: &File) -> Result<Option<DeployRecord>, MeshError> {
    if !record_file.exists().await {
        return Ok(None);
    }
    let record = record_file.read_json().await?;
    Ok(Some(record))
}

/// Save the deploy record
pub async fn save_record(record_file: &File, record: &DeployRecord) -> Result<(), MeshError> {
    record_file.write_json(record).await
}
