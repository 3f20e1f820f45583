//! Deployment verification polling tests

mod common;

use std::sync::Arc;

use common::{fast_verify_options, status_response, MockExecutor};
use meshctl::deploy::verifier::DeploymentVerifier;

fn verifier(executor: Arc<MockExecutor>, max_retries: u32) -> DeploymentVerifier {
    DeploymentVerifier::new(executor).with_options(fast_verify_options(max_retries))
}

#[tokio::test]
async fn test_polls_until_deployed_then_describes_once() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_ok(0, &status_response("pending", None));
    executor.push_ok(0, &status_response("building", None));
    executor.push_ok(0, &status_response("deployed", Some("mesh123")));
    executor.push_ok(0, "Mesh Endpoint: https://example.com/graphql");

    let mut progress: Vec<(u32, u32, u64)> = Vec::new();
    let result = verifier(executor.clone(), 10)
        .verify(std::path::Path::new("."), |attempt, max, elapsed| {
            progress.push((attempt, max, elapsed));
        })
        .await;

    assert!(result.deployed);
    assert_eq!(result.mesh_id.as_deref(), Some("mesh123"));
    assert_eq!(result.endpoint.as_deref(), Some("https://example.com/graphql"));
    assert_eq!(result.error, None);

    // 3 status checks plus one describe; progress fires per status check only
    let calls = executor.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[..3].iter().all(|c| c.contains("api-mesh:status")));
    assert!(calls[3].contains("api-mesh:describe"));
    assert_eq!(progress.len(), 3);
    assert_eq!(progress[0].0, 1);
    assert_eq!(progress[2].0, 3);
    assert!(progress.iter().all(|(_, max, _)| *max == 10));
}

#[tokio::test]
async fn test_error_status_ends_polling_immediately() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_ok(0, &status_response("error", Some("mesh123")));

    let result = verifier(executor.clone(), 50)
        .verify(std::path::Path::new("."), |_, _, _| {})
        .await;

    assert!(!result.deployed);
    assert_eq!(result.mesh_id.as_deref(), Some("mesh123"));
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("failed with error status"));
    assert_eq!(executor.call_count(), 1);
}

#[tokio::test]
async fn test_error_status_carries_cli_detail() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_ok(
        0,
        r#"{"meshStatus": "error", "error": "schema stitching failed"}"#,
    );

    let result = verifier(executor, 5)
        .verify(std::path::Path::new("."), |_, _, _| {})
        .await;

    let error = result.error.unwrap();
    assert!(error.contains("failed with error status"));
    assert!(error.contains("schema stitching failed"));
}

#[tokio::test]
async fn test_retry_budget_exhaustion_times_out() {
    let executor = Arc::new(MockExecutor::new());
    for _ in 0..3 {
        executor.push_ok(0, &status_response("pending", None));
    }

    let mut progress = Vec::new();
    let result = verifier(executor.clone(), 3)
        .verify(std::path::Path::new("."), |attempt, max, _| {
            progress.push((attempt, max));
        })
        .await;

    assert!(!result.deployed);
    assert!(result.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(executor.call_count(), 3);
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_inconclusive_checks_consume_attempts_and_recover() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_exec_error("network unreachable");
    executor.push_ok(1, "");
    executor.push_ok(0, "not json at all");
    executor.push_ok(0, &status_response("deployed", Some("mesh123")));
    executor.push_ok(0, r#"{"endpoint": "https://mesh.example.com/graphql"}"#);

    let result = verifier(executor.clone(), 10)
        .verify(std::path::Path::new("."), |_, _, _| {})
        .await;

    assert!(result.deployed);
    assert_eq!(result.endpoint.as_deref(), Some("https://mesh.example.com/graphql"));
    // 4 status checks (3 inconclusive, 1 terminal) plus the describe
    assert_eq!(executor.call_count(), 5);
}

#[tokio::test]
async fn test_all_checks_inconclusive_is_a_timeout() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_exec_error("boom");
    executor.push_ok(0, "garbage");

    let result = verifier(executor.clone(), 2)
        .verify(std::path::Path::new("."), |_, _, _| {})
        .await;

    assert!(!result.deployed);
    assert!(result.error.as_deref().unwrap().contains("timed out"));
    assert_eq!(executor.call_count(), 2);
}

#[tokio::test]
async fn test_failed_describe_falls_back_to_constructed_endpoint() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_ok(0, &status_response("deployed", Some("mesh123")));
    executor.push_exec_error("describe unavailable");

    let result = verifier(executor, 5)
        .verify(std::path::Path::new("."), |_, _, _| {})
        .await;

    assert!(result.deployed);
    assert_eq!(
        result.endpoint.as_deref(),
        Some("https://edge-graph.adobe.io/api/mesh123/graphql")
    );
}

#[tokio::test]
async fn test_mesh_id_backfilled_from_describe() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_ok(0, &status_response("deployed", None));
    executor.push_ok(
        0,
        r#"{"meshId": "mesh456", "endpoint": "https://mesh.example.com/graphql"}"#,
    );

    let result = verifier(executor, 5)
        .verify(std::path::Path::new("."), |_, _, _| {})
        .await;

    assert!(result.deployed);
    assert_eq!(result.mesh_id.as_deref(), Some("mesh456"));
}

#[tokio::test]
async fn test_success_status_tag_is_terminal_too() {
    let executor = Arc::new(MockExecutor::new());
    executor.push_ok(0, &status_response("success", Some("mesh123")));
    executor.push_ok(0, "Endpoint: https://example.com/graphql");

    let result = verifier(executor, 5)
        .verify(std::path::Path::new("."), |_, _, _| {})
        .await;

    assert!(result.deployed);
}
