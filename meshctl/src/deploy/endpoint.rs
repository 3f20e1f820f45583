//! Mesh endpoint resolution

use serde_json::Value;
use tracing::debug;

/// Where a resolved endpoint came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSource {
    /// Parsed from JSON describe output
    DescribeJson,
    /// Scraped from an `Endpoint:` line in plain-text describe output
    DescribeText,
    /// Constructed from the mesh ID
    Constructed,
}

/// Parsers applied to describe output, in order. The first one to produce
/// a URL wins; when none does, the endpoint is constructed from the mesh ID.
const PARSERS: &[(EndpointSource, fn(&str) -> Option<String>)] = &[
    (EndpointSource::DescribeJson, endpoint_from_json),
    (EndpointSource::DescribeText, endpoint_from_text),
];

/// Resolve the public GraphQL endpoint from describe output.
///
/// Never fails: a missing or unparseable describe response falls through
/// to the constructed form.
pub fn resolve_endpoint(describe_stdout: Option<&str>, mesh_id: &str) -> (String, EndpointSource) {
    if let Some(stdout) = describe_stdout {
        for (source, parser) in PARSERS {
            if let Some(endpoint) = parser(stdout) {
                debug!("Resolved endpoint via {:?}: {}", source, endpoint);
                return (endpoint, *source);
            }
        }
    }

    (constructed_endpoint(mesh_id), EndpointSource::Constructed)
}

/// Construct the canonical endpoint URL for a mesh ID
pub fn constructed_endpoint(mesh_id: &str) -> String {
    format!("https://edge-graph.adobe.io/api/{}/graphql", mesh_id)
}

/// Endpoint from strict JSON describe output
fn endpoint_from_json(stdout: &str) -> Option<String> {
    let value: Value = serde_json::from_str(stdout.trim()).ok()?;
    value
        .get("endpoint")
        .and_then(|endpoint| endpoint.as_str())
        .filter(|endpoint| !endpoint.is_empty())
        .map(|endpoint| endpoint.to_string())
}

/// Endpoint from an `Endpoint: <url>` line in plain-text output
fn endpoint_from_text(stdout: &str) -> Option<String> {
    for line in stdout.lines() {
        if let Some(idx) = line.find("Endpoint:") {
            let rest = line[idx + "Endpoint:".len()..].trim();
            if let Some(url) = rest.split_whitespace().next() {
                if url.starts_with("http") {
                    return Some(url.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_endpoint() {
        let stdout = r#"{"meshId": "abc123", "endpoint": "https://mesh.example.com/graphql"}"#;
        let (endpoint, source) = resolve_endpoint(Some(stdout), "abc123");
        assert_eq!(endpoint, "https://mesh.example.com/graphql");
        assert_eq!(source, EndpointSource::DescribeJson);
    }

    #[test]
    fn test_json_without_endpoint_falls_through_to_text() {
        let stdout = "Mesh ID: abc123\nMesh Endpoint: https://mesh.example.com/graphql\n";
        let (endpoint, source) = resolve_endpoint(Some(stdout), "abc123");
        assert_eq!(endpoint, "https://mesh.example.com/graphql");
        assert_eq!(source, EndpointSource::DescribeText);
    }

    #[test]
    fn test_json_wins_over_text_scan() {
        // The JSON body also contains text a line scan would match; the
        // JSON parser runs first and takes precedence.
        let stdout =
            r#"{"endpoint": "https://a.example.com/graphql", "note": "Endpoint: https://b.example.com"}"#;
        let (endpoint, source) = resolve_endpoint(Some(stdout), "abc123");
        assert_eq!(endpoint, "https://a.example.com/graphql");
        assert_eq!(source, EndpointSource::DescribeJson);
    }

    #[test]
    fn test_text_line_ignores_non_urls() {
        let stdout = "Endpoint: pending\n";
        let (endpoint, source) = resolve_endpoint(Some(stdout), "abc123");
        assert_eq!(endpoint, "https://edge-graph.adobe.io/api/abc123/graphql");
        assert_eq!(source, EndpointSource::Constructed);
    }

    #[test]
    fn test_constructed_fallback() {
        let (endpoint, source) = resolve_endpoint(None, "mesh-42");
        assert_eq!(endpoint, "https://edge-graph.adobe.io/api/mesh-42/graphql");
        assert_eq!(source, EndpointSource::Constructed);

        let (endpoint, source) = resolve_endpoint(Some("no urls here"), "mesh-42");
        assert_eq!(endpoint, "https://edge-graph.adobe.io/api/mesh-42/graphql");
        assert_eq!(source, EndpointSource::Constructed);
    }

    #[test]
    fn test_json_empty_endpoint_falls_through() {
        let stdout = r#"{"endpoint": ""}"#;
        let (_, source) = resolve_endpoint(Some(stdout), "abc123");
        assert_eq!(source, EndpointSource::Constructed);
    }
}
