//! Shared test fixtures

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use meshctl::deploy::deployer::DeployOptions;
use meshctl::deploy::verifier::VerifyOptions;
use meshctl::errors::MeshError;
use meshctl::exec::{CommandExecutor, ExecOptions, ExecOutput};
use meshctl::filesys::dir::Dir;
use meshctl::storage::layout::ProjectLayout;

/// One scripted executor response
pub enum Scripted {
    Ok {
        code: i32,
        stdout: String,
        stderr: String,
    },
    ErrExec(String),
    ErrTimeout(u64),
}

/// Replays scripted responses in FIFO order and records every command.
///
/// Panics when a command arrives after the script is exhausted, so tests
/// catch unexpected extra invocations.
#[derive(Default)]
pub struct MockExecutor {
    responses: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, scripted: Scripted) {
        self.responses.lock().unwrap().push_back(scripted);
    }

    pub fn push_ok(&self, code: i32, stdout: &str) {
        self.push(Scripted::Ok {
            code,
            stdout: stdout.to_string(),
            stderr: String::new(),
        });
    }

    pub fn push_ok_with_stderr(&self, code: i32, stdout: &str, stderr: &str) {
        self.push(Scripted::Ok {
            code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
    }

    pub fn push_exec_error(&self, message: &str) {
        self.push(Scripted::ErrExec(message.to_string()));
    }

    pub fn push_timeout(&self, secs: u64) {
        self.push(Scripted::ErrTimeout(secs));
    }

    /// Every command executed, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandExecutor for MockExecutor {
    async fn execute(
        &self,
        command: &str,
        _options: &ExecOptions,
    ) -> Result<ExecOutput, MeshError> {
        self.calls.lock().unwrap().push(command.to_string());

        let scripted = self.responses.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted::Ok {
                code,
                stdout,
                stderr,
            }) => Ok(ExecOutput {
                code,
                stdout,
                stderr,
                duration: Duration::from_millis(1),
            }),
            Some(Scripted::ErrExec(message)) => Err(MeshError::Exec(message)),
            Some(Scripted::ErrTimeout(secs)) => Err(MeshError::ExecTimeout(secs)),
            None => panic!("unexpected command with exhausted script: {}", command),
        }
    }
}

/// A minimal valid mesh configuration
pub const MINIMAL_MESH: &str = r#"{
  "meshConfig": {
    "sources": [
      {
        "name": "commerce",
        "handler": {"graphql": {"endpoint": "https://commerce.example.com/graphql"}}
      }
    ]
  }
}"#;

/// Create an empty temp project and its layout
pub async fn temp_project() -> (Dir, ProjectLayout) {
    let dir = Dir::create_temp_dir("meshctl-test").await.unwrap();
    let layout = ProjectLayout::new(dir.path());
    (dir, layout)
}

/// Write a mesh.json into the project
pub async fn write_mesh_config(layout: &ProjectLayout, contents: &str) {
    layout
        .mesh_config_file()
        .write_string(contents)
        .await
        .unwrap();
}

/// JSON status output in the shape the CLI prints
pub fn status_response(status: &str, mesh_id: Option<&str>) -> String {
    match mesh_id {
        Some(id) => format!(r#"{{"meshId": "{}", "meshStatus": "{}"}}"#, id, status),
        None => format!(r#"{{"meshStatus": "{}"}}"#, status),
    }
}

/// Verifier options with millisecond waits for fast tests
pub fn fast_verify_options(max_retries: u32) -> VerifyOptions {
    VerifyOptions {
        initial_wait: Duration::from_millis(1),
        poll_interval: Duration::from_millis(1),
        max_retries: Some(max_retries),
        ..VerifyOptions::default()
    }
}

/// Deployer options wired to the fast verifier options
pub fn fast_deploy_options(max_retries: u32) -> DeployOptions {
    DeployOptions {
        verify: fast_verify_options(max_retries),
        ..DeployOptions::default()
    }
}
