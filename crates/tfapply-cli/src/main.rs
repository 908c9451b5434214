//! tfapply: apply a Terraform plan or configuration directory as a CI step
//!
//! Usage:
//!   tfapply [--config .tfapply.toml] [--path PATH] [--decrypt BOOL]
//!           [--outputs BOOL] [--artifact URL]
//!
//! Every flag can also come from the step environment (`INPUT_PATH`,
//! `INPUT_DECRYPT`, `INPUT_OUTPUTS`, `INPUT_ARTIFACT`). Credentials are read
//! from `SECRET` and `GITHUB_TOKEN` only.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tfapply_cli::{ApplyReport, Orchestrator};
use tfapply_core::config::{parse_flag, ApplyConfig, ApplyInputs, Credentials, TfapplyConfig};
use tfapply_exec::{ProcessRunner, WorkflowCommands};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "tfapply",
    version,
    about = "Apply a Terraform plan or configuration directory as a CI step"
)]
struct Cli {
    /// Path to the tfapply settings file
    #[arg(long, short = 'c', env = "TFAPPLY_CONFIG", default_value = ".tfapply.toml")]
    config: PathBuf,

    /// Plan file or configuration directory, relative to the workspace
    #[arg(long, env = "INPUT_PATH", default_value = ".")]
    path: PathBuf,

    /// Decrypt the plan file before applying it
    #[arg(
        long,
        env = "INPUT_DECRYPT",
        default_value = "false",
        value_parser = parse_flag,
        action = clap::ArgAction::Set
    )]
    decrypt: bool,

    /// Republish `terraform output` values as step outputs
    #[arg(
        long,
        env = "INPUT_OUTPUTS",
        default_value = "false",
        value_parser = parse_flag,
        action = clap::ArgAction::Set
    )]
    outputs: bool,

    /// Artifact archive URL to download the plan from
    #[arg(long, env = "INPUT_ARTIFACT")]
    artifact: Option<String>,

    /// Directory the plan path is resolved against (default: current dir)
    #[arg(long, env = "GITHUB_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Scratch directory for downloads
    #[arg(long, env = "RUNNER_TEMP")]
    runner_temp: Option<PathBuf>,

    /// Step output file; legacy `::set-output` commands are used without it
    #[arg(long, env = "GITHUB_OUTPUT")]
    github_output: Option<PathBuf>,

    #[arg(long, env = "SECRET", hide = true, hide_env_values = true)]
    secret: Option<String>,

    #[arg(long, env = "GITHUB_TOKEN", hide = true, hide_env_values = true)]
    token: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides the settings file
    #[arg(long, env = "TFAPPLY_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides the settings file
    #[arg(long, env = "TFAPPLY_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) => {
            info!(
                kind = ?report.kind,
                working_dir = %report.working_dir.display(),
                outputs = report.outputs_published,
                "tfapply finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            let _ = WorkflowCommands::stdout(None).error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ApplyReport> {
    let (settings, found) = load_config(&cli.config).await?;

    let level = cli.log.clone().unwrap_or_else(|| settings.logging.level.clone());
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| match settings.logging.format.as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        });
    init_logging(&level, &format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "tfapply starting"
    );
    if !found {
        tracing::debug!(
            "config file not found: {}  (using defaults)",
            cli.config.display()
        );
    }

    let github_output = cli.github_output.clone();
    let config = build_config(cli, settings)?;
    let host = WorkflowCommands::stdout(github_output);
    let mut orchestrator = Orchestrator::new(config, ProcessRunner, host)?;
    Ok(orchestrator.run().await?)
}

fn build_config(cli: Cli, settings: TfapplyConfig) -> Result<ApplyConfig> {
    let workspace = match cli.workspace {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|e| anyhow::anyhow!("resolving working directory: {e}"))?,
    };

    Ok(ApplyConfig {
        settings,
        inputs: ApplyInputs {
            path: cli.path,
            decrypt: cli.decrypt,
            outputs: cli.outputs,
            artifact: non_empty(cli.artifact),
        },
        credentials: Credentials {
            passphrase: non_empty(cli.secret).map(SecretString::from),
            token: non_empty(cli.token).map(SecretString::from),
        },
        workspace,
        runner_temp: cli.runner_temp.filter(|p| !p.as_os_str().is_empty()),
    })
}

/// Unset and blank step inputs are the same thing.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Load the settings file; a missing file means defaults.
async fn load_config(path: &Path) -> Result<(TfapplyConfig, bool)> {
    if !path.exists() {
        return Ok((TfapplyConfig::default(), false));
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
    let config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?;
    Ok((config, true))
}

/// Logs go to stderr; stdout carries workflow commands.
fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
