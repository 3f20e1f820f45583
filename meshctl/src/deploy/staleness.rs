//! Staleness detection for deployed meshes

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::storage::layout::ProjectLayout;
use crate::storage::record::{load_record, DeployRecord};
use crate::utils::hex_encode;

/// Environment variables that factor into mesh redeployment decisions
pub const MESH_ENV_KEYS: &[&str] = &[
    "ADOBE_COMMERCE_GRAPHQL_ENDPOINT",
    "ADOBE_CATALOG_SERVICE_ENDPOINT",
    "ADOBE_CATALOG_SERVICE_API_KEY",
    "ADOBE_COMMERCE_ENVIRONMENT_ID",
    "ADOBE_COMMERCE_WEBSITE_CODE",
    "ADOBE_COMMERCE_STORE_CODE",
    "ADOBE_COMMERCE_STORE_VIEW_CODE",
];

/// How the recorded deployment compares against current sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Staleness {
    /// Sources and environment match the last deployment
    Fresh,
    /// Something changed since the last deployment; redeploy needed
    Stale(Vec<String>),
    /// No usable record or hash; callers should assume a redeploy is due
    CannotDetermine(String),
}

/// Compute a deterministic content hash over the mesh configuration and
/// its resolver/schema sources.
///
/// The digest feeds mesh.json first, then every file under `resolvers/`
/// and `schemas/` in file-name order. Either directory may be absent and
/// contributes nothing. Returns `None` when mesh.json cannot be read or
/// any listed source file fails to read.
pub async fn calculate_mesh_source_hash(layout: &ProjectLayout) -> Option<String> {
    let config = match layout.mesh_config_file().read_bytes().await {
        Ok(bytes) => bytes,
        Err(_) => {
            debug!("Mesh configuration unreadable, source hash unavailable");
            return None;
        }
    };

    let mut hasher = Sha256::new();
    hasher.update(&config);

    for dir in [layout.resolvers_dir(), layout.schemas_dir()] {
        if !dir.exists().await {
            continue;
        }
        let files = match dir.list_files_sorted().await {
            Ok(files) => files,
            Err(_) => return None,
        };
        for path in files {
            match tokio::fs::read(&path).await {
                Ok(bytes) => hasher.update(&bytes),
                Err(_) => return None,
            }
        }
    }

    Some(hex_encode(hasher.finalize()))
}

/// Read the mesh-relevant environment variables from the project `.env`.
///
/// A missing or unreadable file yields an empty mapping.
pub async fn read_mesh_env_vars(layout: &ProjectLayout) -> BTreeMap<String, String> {
    let contents = match layout.env_file().read_string().await {
        Ok(contents) => contents,
        Err(_) => return BTreeMap::new(),
    };
    parse_mesh_env(&contents)
}

/// Parse `.env`-formatted text, keeping only the allow-listed mesh keys.
///
/// Lines split on the first `=`; values may be wrapped in single or double
/// quotes. Comments, blank lines, and malformed lines are skipped.
pub fn parse_mesh_env(contents: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some(pair) => pair,
            None => continue,
        };

        let key = key.trim();
        if !MESH_ENV_KEYS.contains(&key) {
            continue;
        }

        vars.insert(key.to_string(), strip_quotes(value.trim()).to_string());
    }

    vars
}

/// Strip one layer of matching surrounding quotes
fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Decide whether the recorded deployment is stale relative to current
/// sources and environment.
pub async fn check_staleness(layout: &ProjectLayout) -> Staleness {
    let record = match load_record(&layout.record_file()).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return Staleness::CannotDetermine("no deployment record".to_string());
        }
        Err(e) => {
            return Staleness::CannotDetermine(format!("unreadable deployment record: {}", e));
        }
    };

    let current_hash = calculate_mesh_source_hash(layout).await;
    let current_env = read_mesh_env_vars(layout).await;
    evaluate_record(&record, current_hash.as_deref(), &current_env)
}

/// Pure comparison of a record against freshly computed state
pub fn evaluate_record(
    record: &DeployRecord,
    current_hash: Option<&str>,
    current_env: &BTreeMap<String, String>,
) -> Staleness {
    let current_hash = match current_hash {
        Some(hash) => hash,
        None => {
            return Staleness::CannotDetermine("mesh source hash unavailable".to_string());
        }
    };

    let recorded_hash = match record.source_hash.as_deref() {
        Some(hash) => hash,
        None => {
            return Staleness::CannotDetermine("no source hash recorded".to_string());
        }
    };

    let mut reasons = Vec::new();
    if recorded_hash != current_hash {
        reasons.push("mesh sources changed".to_string());
    }
    if record.env_vars != *current_env {
        reasons.push("mesh environment changed".to_string());
    }

    if reasons.is_empty() {
        Staleness::Fresh
    } else {
        Staleness::Stale(reasons)
    }
}
