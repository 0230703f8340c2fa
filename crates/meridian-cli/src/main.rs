//! Meridian CLI - check recorded telemetry against conventions.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "meridian")]
#[command(about = "Validate recorded telemetry and check semantic conventions")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to meridian.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether the validation tool is installed and compatible
    Probe,

    /// Validate a JSON batch of spans and metrics
    Check {
        /// Batch file with `spans` and `metrics` arrays
        batch: PathBuf,

        /// Exit non-zero when the compliance report has violations
        #[arg(long)]
        fail_on_violations: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result: Result<bool, anyhow::Error> = match cli.command {
        Commands::Probe => commands::probe::run(config).await.map_err(Into::into),
        Commands::Check {
            batch,
            fail_on_violations,
        } => commands::check::run(&batch, config, fail_on_violations)
            .await
            .map_err(Into::into),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
