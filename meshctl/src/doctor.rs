//! Environment preflight checks

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::exec::{CommandExecutor, ExecOptions};

/// A single preflight check result
#[derive(Debug, Clone, Serialize)]
pub struct DoctorCheck {
    /// What was probed
    pub name: String,

    /// Whether the probe succeeded
    pub passed: bool,

    /// Reported version on success, failure description otherwise
    pub detail: String,
}

/// Preflight report over the external tooling meshctl depends on
#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<DoctorCheck>,
    pub ok: bool,
}

/// Probe the Adobe I/O CLI and the Node runtime it rides on
pub async fn run_doctor(executor: &dyn CommandExecutor, aio_command: &str) -> DoctorReport {
    let mut checks = Vec::new();
    checks.push(
        version_check(
            executor,
            "Adobe I/O CLI",
            &format!("{} --version", aio_command),
        )
        .await,
    );
    checks.push(version_check(executor, "Node.js runtime", "node --version").await);

    let ok = checks.iter().all(|check| check.passed);
    DoctorReport { checks, ok }
}

async fn version_check(
    executor: &dyn CommandExecutor,
    name: &str,
    command: &str,
) -> DoctorCheck {
    let options = ExecOptions {
        timeout: Some(Duration::from_secs(30)),
        ..Default::default()
    };

    match executor.execute(command, &options).await {
        Ok(output) if output.success() => {
            let version = output
                .stdout
                .trim()
                .lines()
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            debug!("{}: {}", name, version);
            DoctorCheck {
                name: name.to_string(),
                passed: true,
                detail: version,
            }
        }
        Ok(output) => DoctorCheck {
            name: name.to_string(),
            passed: false,
            detail: format!("exited with code {}", output.code),
        },
        Err(e) => DoctorCheck {
            name: name.to_string(),
            passed: false,
            detail: e.to_string(),
        },
    }
}
