//! Evaluate command - score one repository

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use repohealth::api::{DataClient, RepoId};
use repohealth::config::{HealthConfig, UserConfig};
use repohealth::pipeline::Evaluator;
use repohealth::reporters::{self, OutputFormat};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub struct EvaluateOptions<'a> {
    pub repo: &'a str,
    pub format: OutputFormat,
    pub token: Option<String>,
    pub output: Option<&'a Path>,
    pub fail_under: Option<f64>,
}

/// Run the evaluate command
pub fn run(options: EvaluateOptions<'_>, config: &HealthConfig) -> Result<()> {
    let repo = RepoId::parse(options.repo).context("Invalid repository")?;

    let user_config = UserConfig::load().unwrap_or_else(|e| {
        warn!("Ignoring user config: {:#}", e);
        UserConfig::default()
    });
    let token = user_config.resolve_token(options.token);
    if token.is_none() {
        info!("No API token configured; unauthenticated requests are limited to 60/hour");
    }

    let client = DataClient::with_ureq(
        config.client_options(token),
        config.retry.policy(),
        config.api.timeout(),
    );
    let evaluator = Evaluator::new(client)
        .with_scoring(config.scoring_engine())
        .with_aggregation(config.aggregation_engine());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(create_spinner_style());
    spinner.set_message(format!("Evaluating {repo}..."));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = runtime.block_on(evaluator.evaluate(&repo));
    spinner.finish_and_clear();

    let evaluation = match result {
        Ok(evaluation) => evaluation,
        Err(e) => {
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("hint:").yellow().bold(), hint);
            }
            return Err(e).with_context(|| format!("Failed to evaluate {repo}"));
        }
    };

    let rendered = reporters::report_with_format(&evaluation, options.format)?;
    match options.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} Report written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
        None => println!("{rendered}"),
    }

    if let Some(minimum) = options.fail_under {
        let score = evaluation.health.overall_score;
        if score < minimum {
            anyhow::bail!("Score {score:.1} is below --fail-under {minimum:.1}");
        }
    }

    Ok(())
}

/// Create spinner progress style
fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
