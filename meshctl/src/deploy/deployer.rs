//! Mesh deployment orchestration

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::deploy::config::read_mesh_config;
use crate::deploy::staleness::{calculate_mesh_source_hash, read_mesh_env_vars};
use crate::deploy::verifier::{DeploymentVerifier, VerificationResult, VerifyOptions};
use crate::errors::MeshError;
use crate::exec::{CommandExecutor, ExecOptions, ExecOutput, OutputSink};
use crate::storage::layout::ProjectLayout;
use crate::storage::record::{save_record, DeployRecord};

/// Callback receiving deployment phase updates: (message, detail)
pub type ProgressFn = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Deployment error codes exposed for caller branching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Timeout,
    DeployFailed,
}

/// Tag an error message as a timeout when it indicates the operation ran
/// out of time; generic deploy failure otherwise.
pub fn classify_error_code(message: &str) -> ErrorCode {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("timed out") || lowered.contains("timeout") {
        ErrorCode::Timeout
    } else {
        ErrorCode::DeployFailed
    }
}

/// Structured outcome of a deploy attempt. Failures land here too; the
/// deployer never propagates an error to its caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutcome {
    /// Whether the mesh was deployed and verified
    pub success: bool,

    /// Mesh identity (success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DeployData>,

    /// Failure description (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Failure classification (failure only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

/// Mesh identity returned on success
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployData {
    /// Mesh ID, when the CLI reported one
    pub mesh_id: Option<String>,

    /// Public GraphQL endpoint
    pub endpoint: String,
}

impl DeployOutcome {
    fn ok(mesh_id: Option<String>, endpoint: String) -> Self {
        Self {
            success: true,
            data: Some(DeployData { mesh_id, endpoint }),
            error: None,
            code: None,
        }
    }

    fn failed(error: String) -> Self {
        let code = classify_error_code(&error);
        Self {
            success: false,
            data: None,
            error: Some(error),
            code: Some(code),
        }
    }
}

/// Decides whether a failed create command means the mesh already exists
/// and an update should be issued instead. CLI error wording varies
/// between versions, so the decision is pluggable.
pub trait CreateFailureClassifier: Send + Sync {
    fn already_exists(&self, output: &ExecOutput) -> bool;
}

/// Known CLI phrasings for a create attempt against an existing mesh
const EXISTS_PATTERNS: &[&str] = &["already exists", "mesh already created"];

/// Default classifier matching known CLI phrasings, case-insensitively,
/// in either output stream
#[derive(Debug, Clone, Default)]
pub struct TextPatternClassifier;

impl CreateFailureClassifier for TextPatternClassifier {
    fn already_exists(&self, output: &ExecOutput) -> bool {
        let combined = format!("{}\n{}", output.stderr, output.stdout).to_ascii_lowercase();
        EXISTS_PATTERNS
            .iter()
            .any(|pattern| combined.contains(pattern))
    }
}

/// Deployer options
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Command used to invoke the Adobe I/O CLI
    pub aio_command: String,

    /// Timeout for the create/update command itself
    pub command_timeout: Option<Duration>,

    /// Verifier configuration for the post-deploy polling phase
    pub verify: VerifyOptions,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            aio_command: "aio".to_string(),
            command_timeout: Some(Duration::from_secs(300)), // 5 minutes
            verify: VerifyOptions::default(),
        }
    }
}

/// A single deployment request
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    /// Environment values to write into the project `.env` before deploying
    pub env_vars: Option<BTreeMap<String, String>>,
}

/// Orchestrates create-or-update deployment of a mesh
pub struct MeshDeployer {
    executor: Arc<dyn CommandExecutor>,
    classifier: Arc<dyn CreateFailureClassifier>,
    options: DeployOptions,
}

impl MeshDeployer {
    /// Create a deployer with default options
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            classifier: Arc::new(TextPatternClassifier),
            options: DeployOptions::default(),
        }
    }

    /// Set deployer options
    pub fn with_options(mut self, options: DeployOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the create-failure classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn CreateFailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Deploy the mesh described by `layout`, reporting phases through
    /// `on_progress(message, detail)`. Every failure is converted into the
    /// returned outcome.
    pub async fn deploy(
        &self,
        layout: &ProjectLayout,
        request: &DeployRequest,
        on_progress: ProgressFn,
    ) -> DeployOutcome {
        match self.deploy_impl(layout, request, &on_progress).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Mesh deployment failed: {}", e);
                DeployOutcome::failed(e.to_string())
            }
        }
    }

    async fn deploy_impl(
        &self,
        layout: &ProjectLayout,
        request: &DeployRequest,
        on_progress: &ProgressFn,
    ) -> Result<DeployOutcome, MeshError> {
        // 1. Validate the mesh configuration before touching the CLI
        on_progress("Reading mesh configuration...", "Validating mesh.json");
        let config = read_mesh_config(&layout.mesh_config_file()).await?;
        info!(
            "Mesh configuration valid ({} source(s))",
            config.sources().len()
        );

        // 2. Persist computed environment values for the CLI to expand
        if let Some(env_vars) = &request.env_vars {
            let env_file = layout.env_file();
            env_file
                .write_string(&render_env_file(env_vars))
                .await
                .map_err(|e| {
                    MeshError::Deploy(format!(
                        "Failed to write {}: {}",
                        env_file.path().display(),
                        e
                    ))
                })?;
            debug!(
                "Wrote {} environment value(s) to {}",
                env_vars.len(),
                env_file.path().display()
            );
        }

        // 3. Create first; fall back to update when the mesh already exists
        on_progress("Deploying API Mesh...", "Submitting mesh configuration");
        let output = self.run_create_or_update(layout, on_progress).await?;
        if !output.success() {
            return Ok(DeployOutcome::failed(format!(
                "Mesh deploy command failed: {}",
                summarize_failure(&output)
            )));
        }

        // 4. Poll until the mesh reaches a terminal status
        on_progress("Verifying deployment...", "Waiting for mesh to come online");
        let verification = self.verify_deployment(layout, on_progress).await;
        if !verification.deployed {
            let error = verification
                .error
                .unwrap_or_else(|| "Mesh deployment failed".to_string());
            return Ok(DeployOutcome::failed(error));
        }

        let endpoint = verification.endpoint.clone().unwrap_or_default();

        // 5. Remember what went out so later runs can skip a fresh mesh
        self.record_deployment(layout, &verification, &endpoint)
            .await;

        on_progress("✓ Deployment Complete", &endpoint);
        Ok(DeployOutcome::ok(verification.mesh_id, endpoint))
    }

    /// Issue the create command; on an "already exists" failure, issue an
    /// update instead. Any other create failure is returned as-is.
    async fn run_create_or_update(
        &self,
        layout: &ProjectLayout,
        on_progress: &ProgressFn,
    ) -> Result<ExecOutput, MeshError> {
        let create = format!("{} api-mesh:create mesh.json -c", self.options.aio_command);
        let output = self.run_mesh_command(&create, layout, on_progress).await?;
        if output.success() {
            return Ok(output);
        }

        if self.classifier.already_exists(&output) {
            info!("Mesh already exists, falling back to update");
            on_progress("Deploying API Mesh...", "Mesh exists, updating configuration");
            let update = format!("{} api-mesh:update mesh.json -c", self.options.aio_command);
            return self.run_mesh_command(&update, layout, on_progress).await;
        }

        Ok(output)
    }

    /// Run one mesh CLI command, mapping its live output onto progress
    /// details
    async fn run_mesh_command(
        &self,
        command: &str,
        layout: &ProjectLayout,
        on_progress: &ProgressFn,
    ) -> Result<ExecOutput, MeshError> {
        let progress = on_progress.clone();
        let sink: OutputSink = Arc::new(move |line: &str| {
            if let Some(detail) = summarize_cli_line(line) {
                progress("Deploying API Mesh...", detail);
            }
        });

        let options = ExecOptions {
            cwd: Some(layout.mesh_dir.clone()),
            timeout: self.options.command_timeout,
            on_output: Some(sink),
            ..Default::default()
        };

        self.executor.execute(command, &options).await
    }

    async fn verify_deployment(
        &self,
        layout: &ProjectLayout,
        on_progress: &ProgressFn,
    ) -> VerificationResult {
        let verifier = DeploymentVerifier::new(self.executor.clone())
            .with_aio_command(&self.options.aio_command)
            .with_options(self.options.verify.clone());

        let progress = on_progress.clone();
        verifier
            .verify(&layout.mesh_dir, move |attempt, max_retries, elapsed| {
                progress(
                    "Verifying deployment...",
                    &format!("Status check {}/{} ({}s elapsed)", attempt, max_retries, elapsed),
                );
            })
            .await
    }

    /// Best-effort persistence of the verified deployment; failures are
    /// logged, never fatal
    async fn record_deployment(
        &self,
        layout: &ProjectLayout,
        verification: &VerificationResult,
        endpoint: &str,
    ) {
        let mesh_id = match &verification.mesh_id {
            Some(id) => id.clone(),
            None => {
                debug!("Skipping deploy record: no mesh ID reported");
                return;
            }
        };

        let source_hash = calculate_mesh_source_hash(layout).await;
        let env_vars = read_mesh_env_vars(layout).await;
        let record = DeployRecord::new(mesh_id, endpoint.to_string(), source_hash, env_vars);

        if let Err(e) = save_record(&layout.record_file(), &record).await {
            warn!("Could not write deploy record: {}", e);
        }
    }
}

/// Render KEY=VALUE lines for the project environment file
fn render_env_file(env_vars: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in env_vars {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Map a raw CLI output line to a terse progress detail
fn summarize_cli_line(line: &str) -> Option<&'static str> {
    let lowered = line.to_ascii_lowercase();
    if lowered.contains("validating") {
        Some("Validating configuration")
    } else if lowered.contains("creating") {
        Some("Creating mesh infrastructure")
    } else if lowered.contains("updating") {
        Some("Updating mesh configuration")
    } else if lowered.contains("provisioning") {
        Some("Provisioning mesh resources")
    } else if lowered.contains("building") {
        Some("Building mesh artifacts")
    } else {
        None
    }
}

/// Pick the most useful line out of a failed command's output
fn summarize_failure(output: &ExecOutput) -> String {
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        return stderr.lines().last().unwrap_or(stderr).trim().to_string();
    }

    let stdout = output.stdout.trim();
    if !stdout.is_empty() {
        return stdout.lines().last().unwrap_or(stdout).trim().to_string();
    }

    format!("exit code {}", output.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: i32, stdout: &str, stderr: &str) -> ExecOutput {
        ExecOutput {
            code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_classify_error_code() {
        assert_eq!(
            classify_error_code("Command timed out after 300 seconds"),
            ErrorCode::Timeout
        );
        assert_eq!(
            classify_error_code("Deployment TIMEOUT exceeded"),
            ErrorCode::Timeout
        );
        assert_eq!(
            classify_error_code("Mesh deployment failed with error status"),
            ErrorCode::DeployFailed
        );
        assert_eq!(classify_error_code("quota exceeded"), ErrorCode::DeployFailed);
    }

    #[test]
    fn test_exists_classifier_matches_either_stream() {
        let classifier = TextPatternClassifier;
        assert!(classifier.already_exists(&output(
            1,
            "",
            "Error: mesh already exists for workspace 12345"
        )));
        assert!(classifier.already_exists(&output(1, "Mesh Already Created", "")));
        assert!(!classifier.already_exists(&output(1, "", "Error: invalid credentials")));
        assert!(!classifier.already_exists(&output(1, "", "")));
    }

    #[test]
    fn test_summarize_cli_line() {
        assert_eq!(
            summarize_cli_line("Validating mesh configuration..."),
            Some("Validating configuration")
        );
        assert_eq!(
            summarize_cli_line("Creating mesh..."),
            Some("Creating mesh infrastructure")
        );
        assert_eq!(
            summarize_cli_line("..Provisioning edge nodes"),
            Some("Provisioning mesh resources")
        );
        assert_eq!(summarize_cli_line("random noise"), None);
        assert_eq!(summarize_cli_line(""), None);
    }

    #[test]
    fn test_summarize_failure_prefers_stderr() {
        let out = output(1, "stdout line", "first\nError: bad credentials\n");
        assert_eq!(summarize_failure(&out), "Error: bad credentials");

        let out = output(1, "only stdout\nlast line", "");
        assert_eq!(summarize_failure(&out), "last line");

        let out = output(7, "", "");
        assert_eq!(summarize_failure(&out), "exit code 7");
    }

    #[test]
    fn test_render_env_file() {
        let mut vars = BTreeMap::new();
        vars.insert("B_KEY".to_string(), "two".to_string());
        vars.insert("A_KEY".to_string(), "one".to_string());
        assert_eq!(render_env_file(&vars), "A_KEY=one\nB_KEY=two\n");
    }

    #[test]
    fn test_failed_outcome_carries_code() {
        let outcome = DeployOutcome::failed("Command timed out after 300 seconds".to_string());
        assert!(!outcome.success);
        assert_eq!(outcome.code, Some(ErrorCode::Timeout));

        let outcome = DeployOutcome::failed("Mesh deploy command failed: denied".to_string());
        assert_eq!(outcome.code, Some(ErrorCode::DeployFailed));
    }
}
