//! CLI command definitions and handlers

mod evaluate;
mod init;

use anyhow::Result;
use clap::{Parser, Subcommand};
use repohealth::config::{load_config_file, load_health_config, HealthConfig};
use repohealth::reporters::OutputFormat;
use std::path::{Path, PathBuf};

/// Parse a score threshold (0-100)
fn parse_score(s: &str) -> Result<f64, String> {
    let n: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if (0.0..=100.0).contains(&n) {
        Ok(n)
    } else {
        Err("score must be between 0 and 100".to_string())
    }
}

/// repohealth - Repository health evaluation
#[derive(Parser, Debug)]
#[command(name = "repohealth")]
#[command(
    version,
    about = "Score a GitHub repository's activity, community, maintenance, documentation and governance",
    after_help = "\
Examples:
  repohealth evaluate rust-lang/cargo                 Text report
  repohealth evaluate rust-lang/cargo --format json   JSON output for scripting
  repohealth evaluate owner/repo --fail-under 60      Exit code 1 below 60 (CI mode)
  repohealth init                                     Write repohealth.toml

Set GITHUB_TOKEN (or pass --token) to raise the API rate limit."
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Config file (default: repohealth.toml or .repohealthrc.json in the current directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a repository's health
    #[command(after_help = "\
Examples:
  repohealth evaluate tokio-rs/tokio
  repohealth evaluate https://github.com/tokio-rs/tokio
  repohealth evaluate tokio-rs/tokio --format json -o health.json")]
    Evaluate {
        /// Repository as owner/name or a github.com URL
        repo: String,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// API token
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit with an error when the overall score is below this value
        #[arg(long, value_parser = parse_score)]
        fail_under: Option<f64>,
    },

    /// Initialize a repohealth.toml config file with the default settings
    Init {
        /// Directory to write the config to
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path, force } => init::run(&path, force),
        Commands::Evaluate {
            repo,
            format,
            token,
            output,
            fail_under,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let options = evaluate::EvaluateOptions {
                repo: &repo,
                format: format.parse::<OutputFormat>()?,
                token,
                output: output.as_deref(),
                fail_under,
            };
            evaluate::run(options, &config)
        }
    }
}

/// An explicit --config must load; the implicit lookup falls back to defaults
fn load_config(explicit: Option<&Path>) -> Result<HealthConfig> {
    match explicit {
        Some(path) => load_config_file(path),
        None => Ok(load_health_config(Path::new("."))),
    }
}
