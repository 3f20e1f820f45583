//! Mesh configuration and CLI report models

use serde::{Deserialize, Serialize};

/// An upstream source declared in the mesh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshSource {
    /// Source name
    pub name: String,

    /// Handler wiring for this source
    pub handler: SourceHandler,
}

/// Handler description for a mesh source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHandler {
    /// GraphQL handler, when this source is a GraphQL upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphql: Option<GraphqlHandler>,
}

/// GraphQL handler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlHandler {
    /// Upstream GraphQL endpoint URL
    pub endpoint: String,
}

/// Parsed output of the mesh status command
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshStatusReport {
    /// Mesh ID, when the CLI reports one
    #[serde(default)]
    pub mesh_id: Option<String>,

    /// Raw status tag: 'pending', 'building', 'deployed', 'error', ...
    #[serde(default)]
    pub mesh_status: Option<String>,

    /// Error detail accompanying a failed status
    #[serde(default)]
    pub error: Option<String>,
}

/// Parsed output of the mesh describe command
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshDescribeReport {
    /// Mesh ID, when the CLI reports one
    #[serde(default)]
    pub mesh_id: Option<String>,

    /// Public GraphQL endpoint, when the CLI reports one
    #[serde(default)]
    pub endpoint: Option<String>,
}
