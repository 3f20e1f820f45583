//! meshctl - Entry Point
//!
//! One-shot CLI over the mesh deployment subsystem: deploy and verify a
//! mesh, check whether a deployed mesh is stale, delete a mesh, and
//! preflight the local tooling.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use meshctl::deploy::deleter::MeshDeleter;
use meshctl::deploy::deployer::{DeployRequest, MeshDeployer, ProgressFn};
use meshctl::deploy::staleness::{check_staleness, Staleness};
use meshctl::deploy::verifier::DeploymentVerifier;
use meshctl::doctor::run_doctor;
use meshctl::exec::shell::ShellExecutor;
use meshctl::exec::CommandExecutor;
use meshctl::logs::{init_logging, LogLevel, LogOptions};
use meshctl::storage::layout::ProjectLayout;
use meshctl::storage::settings::Settings;
use meshctl::utils::version_info;

use tracing::error;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        println!("{}", serde_json::to_string_pretty(&version_info()).unwrap());
        return;
    }

    if cli_args.contains_key("help") || cli_args.is_empty() {
        print_usage();
        return;
    }

    // Project layout from --project (default: current directory)
    let project_dir = cli_args
        .get("project")
        .cloned()
        .unwrap_or_else(|| ".".to_string());
    let mut layout = ProjectLayout::new(&project_dir);
    if let Some(mesh_dir) = cli_args.get("mesh-dir") {
        layout = layout.with_mesh_dir(mesh_dir);
    }

    // Retrieve the settings file, falling back to defaults
    let settings = load_settings(&layout).await;

    // Initialize logging; progress reporting owns stdout
    let verbose = cli_args.contains_key("verbose");
    let log_options = LogOptions {
        log_level: if verbose {
            LogLevel::Debug
        } else {
            settings.log_level.clone()
        },
        stderr: verbose,
        log_dir: if cli_args.contains_key("log-file") {
            Some(layout.logs_dir().path().to_path_buf())
        } else {
            None
        },
        json_format: false,
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };

    let executor: Arc<dyn CommandExecutor> = Arc::new(ShellExecutor::new());
    let json_output = cli_args.contains_key("json");

    if cli_args.contains_key("doctor") {
        return doctor(executor, &settings, json_output).await;
    }

    if cli_args.contains_key("deploy") {
        return deploy(executor, &layout, &settings, json_output).await;
    }

    if cli_args.contains_key("verify") {
        return verify(executor, &layout, &settings, json_output).await;
    }

    if cli_args.contains_key("check") {
        return check(&layout, json_output).await;
    }

    if cli_args.contains_key("delete") {
        let mesh_id = match cli_args.get("mesh-id") {
            Some(id) => id.clone(),
            None => {
                eprintln!("[ERROR] --delete requires --mesh-id=<id>");
                std::process::exit(1);
            }
        };
        return delete(executor, &layout, &settings, &mesh_id).await;
    }

    print_usage();
}

fn print_usage() {
    println!("meshctl - Adobe API Mesh deployment toolkit");
    println!();
    println!("Usage:");
    println!("  meshctl --deploy  [--project=<dir>] [--mesh-dir=<dir>] [--json]");
    println!("  meshctl --verify  [--project=<dir>] [--json]");
    println!("  meshctl --check   [--project=<dir>] [--json]");
    println!("  meshctl --delete  --mesh-id=<id> [--project=<dir>]");
    println!("  meshctl --doctor  [--json]");
    println!("  meshctl --version");
    println!();
    println!("Options:");
    println!("  --project=<dir>   Project root (default: current directory)");
    println!("  --mesh-dir=<dir>  Directory holding mesh.json (default: project root)");
    println!("  --json            Print the result as JSON on stdout");
    println!("  --verbose         Log debug output to stderr");
    println!("  --log-file        Also write logs under <project>/.meshctl/logs");
}

/// Read `.meshctl/settings.json`, falling back to defaults
async fn load_settings(layout: &ProjectLayout) -> Settings {
    let settings_file = layout.settings_file();
    if !settings_file.exists().await {
        return Settings::default();
    }

    match settings_file.read_json::<Settings>().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("[WARN] Ignoring unreadable settings file: {}", e);
            Settings::default()
        }
    }
}

async fn deploy(
    executor: Arc<dyn CommandExecutor>,
    layout: &ProjectLayout,
    settings: &Settings,
    json_output: bool,
) {
    let deployer = MeshDeployer::new(executor).with_options(settings.deploy_options());

    // The project .env is read by the CLI as-is; only callers that compute
    // environment values programmatically populate the request
    let request = DeployRequest::default();

    let on_progress: ProgressFn = if json_output {
        Arc::new(|_message: &str, _detail: &str| {})
    } else {
        Arc::new(|message: &str, detail: &str| {
            println!("{} {}", message, detail);
        })
    };

    let outcome = deployer.deploy(layout, &request, on_progress).await;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).unwrap_or_default()
        );
    } else if outcome.success {
        let endpoint = outcome
            .data
            .as_ref()
            .map(|data| data.endpoint.as_str())
            .unwrap_or("");
        println!("\n[SUCCESS] Mesh deployed: {}", endpoint);
    } else {
        eprintln!(
            "\n[ERROR] {}",
            outcome.error.as_deref().unwrap_or("deployment failed")
        );
    }

    if !outcome.success {
        std::process::exit(1);
    }
}

async fn verify(
    executor: Arc<dyn CommandExecutor>,
    layout: &ProjectLayout,
    settings: &Settings,
    json_output: bool,
) {
    let verifier = DeploymentVerifier::new(executor)
        .with_aio_command(&settings.aio_command)
        .with_options(settings.verify_options());

    let result = verifier
        .verify(&layout.mesh_dir, |attempt, max_retries, elapsed| {
            if !json_output {
                println!("Status check {}/{} ({}s elapsed)", attempt, max_retries, elapsed);
            }
        })
        .await;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).unwrap_or_default()
        );
    } else if result.deployed {
        println!(
            "\n[SUCCESS] Mesh is deployed: {}",
            result.endpoint.as_deref().unwrap_or("")
        );
    } else {
        eprintln!(
            "\n[ERROR] {}",
            result.error.as_deref().unwrap_or("verification failed")
        );
    }

    if !result.deployed {
        std::process::exit(1);
    }
}

async fn check(layout: &ProjectLayout, json_output: bool) {
    let staleness = check_staleness(layout).await;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&staleness).unwrap_or_default()
        );
    } else {
        match &staleness {
            Staleness::Fresh => println!("[SUCCESS] Deployed mesh matches current sources"),
            Staleness::Stale(reasons) => {
                println!("[STALE] Redeploy needed: {}", reasons.join(", "));
            }
            Staleness::CannotDetermine(reason) => {
                println!("[UNKNOWN] {} (deploy to refresh)", reason);
            }
        }
    }

    if !matches!(staleness, Staleness::Fresh) {
        std::process::exit(1);
    }
}

async fn delete(
    executor: Arc<dyn CommandExecutor>,
    layout: &ProjectLayout,
    settings: &Settings,
    mesh_id: &str,
) {
    let deleter = MeshDeleter::new(executor)
        .with_aio_command(&settings.aio_command)
        .with_cwd(layout.mesh_dir.clone());

    if deleter.delete(mesh_id).await {
        println!("[SUCCESS] Mesh {} deleted", mesh_id);
    } else {
        eprintln!("[ERROR] Could not delete mesh {}", mesh_id);
        std::process::exit(1);
    }
}

async fn doctor(executor: Arc<dyn CommandExecutor>, settings: &Settings, json_output: bool) {
    let report = run_doctor(executor.as_ref(), &settings.aio_command).await;

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_default()
        );
    } else {
        for c in &report.checks {
            let marker = if c.passed { "[OK]  " } else { "[FAIL]" };
            println!("{} {}: {}", marker, c.name, c.detail);
        }
    }

    if !report.ok {
        error!("Preflight checks failed");
        std::process::exit(1);
    }
}
