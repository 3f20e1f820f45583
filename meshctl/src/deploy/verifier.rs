//! Deployment verification polling

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::deploy::endpoint::resolve_endpoint;
use crate::exec::{CommandExecutor, ExecOptions};
use crate::models::mesh::{MeshDescribeReport, MeshStatusReport};

/// Status tags that end polling successfully
const SUCCESS_STATUSES: &[&str] = &["deployed", "success"];

/// Status tags that end polling with a failure
const FAILURE_STATUSES: &[&str] = &["error", "failed"];

/// Verifier options
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Delay before the first status check
    pub initial_wait: Duration,

    /// Delay between subsequent status checks
    pub poll_interval: Duration,

    /// Upper bound on status checks; derived from the long-operation
    /// ceiling when unset
    pub max_retries: Option<u32>,

    /// Total time budget used to derive max_retries
    pub long_operation_ceiling: Duration,

    /// Timeout applied to each status/describe command
    pub command_timeout: Option<Duration>,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(5),
            poll_interval: Duration::from_secs(10),
            max_retries: None,
            long_operation_ceiling: Duration::from_secs(300), // 5 minutes
            command_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl VerifyOptions {
    /// Effective poll budget. When not set explicitly, the long-operation
    /// ceiling minus the initial wait is divided by the poll interval,
    /// rounding down. Always at least 1.
    pub fn effective_max_retries(&self) -> u32 {
        if let Some(max) = self.max_retries {
            return max.max(1);
        }

        let budget_ms = self
            .long_operation_ceiling
            .saturating_sub(self.initial_wait)
            .as_millis();
        let interval_ms = self.poll_interval.as_millis().max(1);
        ((budget_ms / interval_ms) as u32).max(1)
    }
}

/// Polling classification of a raw CLI status tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Keep polling
    Pending,
    /// Deployment reached a good terminal state
    TerminalSuccess,
    /// Deployment reached a failed terminal state
    TerminalFailure,
}

/// Classify a raw CLI status tag. Unknown tags keep polling until the
/// retry budget runs out.
pub fn classify_status(status: &str) -> StatusClass {
    let status = status.trim().to_ascii_lowercase();
    if SUCCESS_STATUSES.contains(&status.as_str()) {
        StatusClass::TerminalSuccess
    } else if FAILURE_STATUSES.contains(&status.as_str()) {
        StatusClass::TerminalFailure
    } else {
        StatusClass::Pending
    }
}

/// Outcome of a verification polling cycle
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether the mesh reached a deployed state
    pub deployed: bool,

    /// Mesh ID, when one was discovered (may be present on failure too)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_id: Option<String>,

    /// Public GraphQL endpoint (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Failure description (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    fn success(mesh_id: Option<String>, endpoint: String) -> Self {
        Self {
            deployed: true,
            mesh_id,
            endpoint: Some(endpoint),
            error: None,
        }
    }

    fn failure(mesh_id: Option<String>, error: String) -> Self {
        Self {
            deployed: false,
            mesh_id,
            endpoint: None,
            error: Some(error),
        }
    }
}

/// One status poll, before classification
enum Poll {
    /// The CLI produced a parseable status report
    Status(MeshStatusReport),
    /// The check could not be interpreted; counts against the budget
    Inconclusive(String),
}

/// Polls mesh status after a deploy command until a terminal state, then
/// resolves the public endpoint.
pub struct DeploymentVerifier {
    executor: Arc<dyn CommandExecutor>,
    aio_command: String,
    options: VerifyOptions,
}

impl DeploymentVerifier {
    /// Create a verifier with default options
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            aio_command: "aio".to_string(),
            options: VerifyOptions::default(),
        }
    }

    /// Set verifier options
    pub fn with_options(mut self, options: VerifyOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the Adobe I/O CLI command
    pub fn with_aio_command(mut self, aio_command: impl Into<String>) -> Self {
        self.aio_command = aio_command.into();
        self
    }

    /// Poll deployment status until a terminal state or the retry budget
    /// is exhausted.
    ///
    /// `on_progress` fires after every status check with the attempt
    /// number, the retry budget, and whole seconds elapsed since this call
    /// began. Inconclusive checks (command failures, unparseable output)
    /// consume attempts instead of aborting; a run of bad checks ends as a
    /// timeout, not an error.
    pub async fn verify<P>(&self, mesh_dir: &Path, mut on_progress: P) -> VerificationResult
    where
        P: FnMut(u32, u32, u64) + Send,
    {
        let started = Instant::now();
        let max_retries = self.options.effective_max_retries();
        let mut mesh_id: Option<String> = None;

        debug!(
            "Waiting {:?} before first status check",
            self.options.initial_wait
        );
        tokio::time::sleep(self.options.initial_wait).await;

        for attempt in 1..=max_retries {
            if attempt > 1 {
                tokio::time::sleep(self.options.poll_interval).await;
            }

            let poll = self.poll_status(mesh_dir).await;
            on_progress(attempt, max_retries, started.elapsed().as_secs());

            match poll {
                Poll::Status(report) => {
                    if report.mesh_id.is_some() {
                        mesh_id = report.mesh_id.clone();
                    }
                    let status = report.mesh_status.clone().unwrap_or_default();

                    match classify_status(&status) {
                        StatusClass::TerminalSuccess => {
                            debug!("Mesh reached '{}' after {} check(s)", status, attempt);
                            return self.resolve_success(mesh_dir, mesh_id).await;
                        }
                        StatusClass::TerminalFailure => {
                            let mut error =
                                format!("Mesh deployment failed with {} status", status);
                            if let Some(detail) = &report.error {
                                error = format!("{}: {}", error, detail);
                            }
                            return VerificationResult::failure(mesh_id, error);
                        }
                        StatusClass::Pending => {
                            debug!(
                                "Mesh status '{}', polling again ({}/{})",
                                status, attempt, max_retries
                            );
                        }
                    }
                }
                Poll::Inconclusive(reason) => {
                    warn!(
                        "Status check inconclusive ({}), polling again ({}/{})",
                        reason, attempt, max_retries
                    );
                }
            }
        }

        VerificationResult::failure(
            mesh_id,
            format!(
                "Mesh deployment verification timed out after {} attempts",
                max_retries
            ),
        )
    }

    /// Run one status command and parse its output
    async fn poll_status(&self, mesh_dir: &Path) -> Poll {
        let command = format!("{} api-mesh:status", self.aio_command);
        let options = ExecOptions {
            cwd: Some(mesh_dir.to_path_buf()),
            timeout: self.options.command_timeout,
            ..Default::default()
        };

        let output = match self.executor.execute(&command, &options).await {
            Ok(output) => output,
            Err(e) => return Poll::Inconclusive(e.to_string()),
        };

        if !output.success() {
            return Poll::Inconclusive(format!(
                "status command exited with code {}",
                output.code
            ));
        }

        match serde_json::from_str::<MeshStatusReport>(output.stdout.trim()) {
            Ok(report) => Poll::Status(report),
            Err(e) => Poll::Inconclusive(format!("unparseable status output: {}", e)),
        }
    }

    /// Describe the mesh and resolve its endpoint. Endpoint resolution
    /// never fails the verification; the constructed form covers a failed
    /// describe call.
    async fn resolve_success(
        &self,
        mesh_dir: &Path,
        mesh_id: Option<String>,
    ) -> VerificationResult {
        let command = format!("{} api-mesh:describe", self.aio_command);
        let options = ExecOptions {
            cwd: Some(mesh_dir.to_path_buf()),
            timeout: self.options.command_timeout,
            ..Default::default()
        };

        let describe_stdout = match self.executor.execute(&command, &options).await {
            Ok(output) if output.success() => Some(output.stdout),
            Ok(output) => {
                warn!("Describe command exited with code {}", output.code);
                None
            }
            Err(e) => {
                warn!("Describe command failed: {}", e);
                None
            }
        };

        // Describe output may carry the mesh ID when the status report did not
        let mesh_id = mesh_id.or_else(|| {
            describe_stdout.as_deref().and_then(|stdout| {
                serde_json::from_str::<MeshDescribeReport>(stdout.trim())
                    .ok()
                    .and_then(|report| report.mesh_id)
            })
        });

        let id_for_url = mesh_id.clone().unwrap_or_default();
        let (endpoint, source) = resolve_endpoint(describe_stdout.as_deref(), &id_for_url);
        debug!("Mesh endpoint resolved from {:?}", source);

        VerificationResult::success(mesh_id, endpoint)
    }
}
