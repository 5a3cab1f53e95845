//! Binary entry point for the movedeploy CLI.

use std::io::{self, Write};
use std::process;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use movedeploy::{
    CompileResponse, ConfigError, CredentialManager, CredentialStrategy, DeployConfig,
    DeployOrchestrator, DeployResponse, HostKeyFiles, ProcessCommandRunner,
};

mod cli;

use cli::{Cli, CompileCheckCommand, DeployCommand};

/// Exit status used when SIGINT or SIGTERM ends the run early.
const INTERRUPTED_EXIT_CODE: i32 = 130;

type Orchestrator = DeployOrchestrator<ProcessCommandRunner, HostKeyFiles>;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write response: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    let config = DeployConfig::load_without_cli_args()?;
    config.validate()?;

    match cli {
        Cli::Deploy(command) => run_deploy(&config, &command).await,
        Cli::CompileCheck(command) => run_compile_check(&config, &command).await,
    }
}

fn build_orchestrator(config: &DeployConfig) -> Orchestrator {
    let credentials = CredentialManager::new(config.aptos_cli(), ProcessCommandRunner, HostKeyFiles)
        .with_settings(config.credential_settings());
    DeployOrchestrator::new(credentials, config.explorer())
}

fn resolve_package_dir(flag: Option<&str>, configured: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(flag.unwrap_or(configured).trim())
}

async fn run_deploy(config: &DeployConfig, command: &DeployCommand) -> Result<i32, CliError> {
    let strategy = if command.standing {
        CredentialStrategy::Standing
    } else {
        config.strategy()?
    };
    let orchestrator = build_orchestrator(config).with_strategy(strategy);
    let package_dir = resolve_package_dir(command.package_dir.as_deref(), &config.package_dir);

    let outcome = tokio::select! {
        result = deploy_all(&orchestrator, &package_dir, command.count) => result,
        () = shutdown_signal() => {
            warn!("interrupted; abandoning in-flight deployment");
            Ok(INTERRUPTED_EXIT_CODE)
        }
    };
    orchestrator.shutdown().await;
    outcome
}

async fn deploy_all(
    orchestrator: &Orchestrator,
    package_dir: &Utf8Path,
    count: u32,
) -> Result<i32, CliError> {
    let mut all_succeeded = true;
    for attempt in 1..=count {
        info!(attempt, count, "deployment attempt");
        let result = orchestrator.deploy(package_dir).await;
        if let Err(err) = &result {
            error!(kind = ?err.kind(), error = %err, "deployment failed");
            all_succeeded = false;
        }
        write_json(io::stdout(), &DeployResponse::from(&result))?;
    }
    Ok(exit_code(all_succeeded))
}

async fn run_compile_check(
    config: &DeployConfig,
    command: &CompileCheckCommand,
) -> Result<i32, CliError> {
    let orchestrator = build_orchestrator(config);
    let package_dir = resolve_package_dir(command.package_dir.as_deref(), &config.package_dir);

    tokio::select! {
        result = orchestrator.compile_check(&package_dir) => {
            if let Err(err) = &result {
                error!(kind = ?err.kind(), error = %err, "compile check failed");
            }
            write_json(io::stdout(), &CompileResponse::from(&result))?;
            Ok(exit_code(result.is_ok()))
        }
        () = shutdown_signal() => {
            warn!("interrupted; abandoning compile check");
            Ok(INTERRUPTED_EXIT_CODE)
        }
    }
}

const fn exit_code(success: bool) -> i32 {
    if success { 0 } else { 1 }
}

fn write_json(mut target: impl Write, value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string(value)?;
    writeln!(target, "{rendered}")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C"),
        () = terminate => info!("received SIGTERM"),
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
