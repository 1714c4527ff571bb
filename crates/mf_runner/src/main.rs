//! mf-runner - executes matched-filter job requests.
//!
//! This is the process an execution bridge starts. It reads one serialized
//! `JobRequest`, runs it in-process, and prints the `JobOutcome` as JSON on
//! stdout. Progress and cancellation go through files in the job's output
//! directory, so `status` and `cancel` can be run from anywhere.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mf_core::config::{ConfigManager, Settings};
use mf_core::jobs::{read_progress, request_cancel, BUILD_PROGRESS_FILE, SWEEP_PROGRESS_FILE};
use mf_core::logging::{init_tracing, LogLevel};
use mf_core::orchestrator::{ExecutionBridge, LocalBridge};

#[derive(Parser, Debug)]
#[command(author, version, about = "Matched-filter job runner", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is not set.
    #[arg(long, value_enum, default_value_t = Level::Info, global = true)]
    log_level: Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a job request from a JSON file ("-" reads stdin).
    Run {
        request: PathBuf,
        /// Settings file. Created with defaults if missing.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Ask the job writing into a directory to stop.
    Cancel { dir: PathBuf },
    /// Print the progress of the job writing into a directory.
    Status {
        dir: PathBuf,
        #[arg(long, value_enum, default_value_t = Kind::Sweep)]
        kind: Kind,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Sweep,
    Build,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.into());

    match cli.command {
        Commands::Run { request, config } => run(&request, config.as_deref()),
        Commands::Cancel { dir } => {
            let path = request_cancel(&dir)
                .with_context(|| format!("writing cancel sentinel in {}", dir.display()))?;
            tracing::info!("Requested cancellation via {}", path.display());
            Ok(())
        }
        Commands::Status { dir, kind } => {
            let file = match kind {
                Kind::Sweep => SWEEP_PROGRESS_FILE,
                Kind::Build => BUILD_PROGRESS_FILE,
            };
            match read_progress(&dir.join(file)) {
                Some(p) => println!("{} {}", p.done, p.total),
                None => println!("not started"),
            }
            Ok(())
        }
    }
}

fn run(request_path: &Path, config: Option<&Path>) -> Result<()> {
    let json = if request_path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("reading request from stdin")?
    } else {
        fs::read_to_string(request_path)
            .with_context(|| format!("reading request {}", request_path.display()))?
    };

    let settings = load_settings(config)?;
    let bridge = LocalBridge::new(settings);
    let outcome = bridge.submit_json(&json)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let Some(path) = config else {
        return Ok(Settings::default());
    };
    let mut manager = ConfigManager::new(path);
    manager
        .load_or_create()
        .with_context(|| format!("loading settings from {}", path.display()))?;
    Ok(manager.into_settings())
}
