//! # rcond CLI
//!
//! Runs scenario scripts against the rcond condition system.

mod commands;
mod eval;
mod script;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use rcond_core::{SessionOptions, WarnMode};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rcond")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "rcond.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the configured warning mode
    #[arg(long, value_enum)]
    warn: Option<WarnArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario script
    Run {
        /// Script to run
        script: PathBuf,

        /// Exit with an error if any unit aborted
        #[arg(long)]
        strict: bool,
    },

    /// Parse a scenario script without running it
    Check {
        /// Script to check
        script: PathBuf,
    },
}

#[derive(Copy, Clone, ValueEnum)]
pub enum WarnArg {
    Ignore,
    Deferred,
    Immediate,
    Error,
}

impl From<WarnArg> for WarnMode {
    fn from(arg: WarnArg) -> Self {
        match arg {
            WarnArg::Ignore => WarnMode::Ignore,
            WarnArg::Deferred => WarnMode::Deferred,
            WarnArg::Immediate => WarnMode::Immediate,
            WarnArg::Error => WarnMode::Error,
        }
    }
}

/// Load options from `path`, falling back to defaults when it does not exist
fn load_options(path: &Path, warn: Option<WarnArg>) -> anyhow::Result<SessionOptions> {
    let options = if path.exists() {
        SessionOptions::from_file(path).context("Failed to load configuration")?
    } else {
        tracing::debug!(config = %path.display(), "no configuration file, using defaults");
        SessionOptions::default()
    };
    Ok(match warn {
        Some(mode) => options.with_warn(mode.into()),
        None => options,
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::WARN.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { script, strict } => {
            let options = load_options(&cli.config, cli.warn)?;
            commands::run_script(&script, options, strict)
        }
        Commands::Check { script } => commands::check_script(&script),
    }
}
