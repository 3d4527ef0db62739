//! Evaluation configuration
//!
//! Loads configuration from `repohealth.toml` or `.repohealthrc.json` in the
//! working directory, or from an explicit `--config` path.
//!
//! # Configuration Format
//!
//! ```toml
//! # repohealth.toml
//!
//! [api]
//! base_url = "https://api.github.com"
//! timeout_secs = 30
//! per_page = 100
//! max_pages = 5
//!
//! [retry]
//! max_attempts = 5
//! base_delay_ms = 1000
//! max_delay_ms = 60000
//!
//! [cache]
//! badge_ttl_secs = 3600
//!
//! [scoring.weights]
//! activity = 0.3
//! governance = 0.15
//!
//! [scoring.thresholds.stars]
//! kind = "numeric"
//! thresholds = [50, 500, 2000, 8000, 30000]
//! scores = [10, 30, 60, 80, 100]
//! ```

use crate::api::{ClientOptions, RetryPolicy};
use crate::metrics::MetricId;
use crate::scoring::{AggregationEngine, CategoryWeights, ScoringEngine, ThresholdConfig};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Config file names searched in the working directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &["repohealth.toml", ".repohealthrc.json"];

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// Remote API endpoints and paging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// REST API root (default: https://api.github.com)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Best-practices badge service root
    #[serde(default = "default_badge_url")]
    pub badge_url: String,

    /// User-Agent header (default: repohealth/<version>)
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Items per list page (default: 100, the API maximum)
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Pages fetched per list endpoint (default: 5)
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            badge_url: default_badge_url(),
            user_agent: None,
            timeout_secs: default_timeout_secs(),
            per_page: default_per_page(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}
fn default_badge_url() -> String {
    "https://www.bestpractices.dev".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_per_page() -> u32 {
    100
}
fn default_max_pages() -> u32 {
    5
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Backoff settings for retryable failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first call (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter upper bound as a fraction of the delay (default: 0.3)
    #[serde(default = "default_jitter_ratio")]
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ratio: default_jitter_ratio(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    60_000
}
fn default_jitter_ratio() -> f64 {
    0.3
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.base_delay_ms)),
            jitter_ratio: self.jitter_ratio.clamp(0.0, 1.0),
        }
    }
}

/// Cache lifetimes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a badge lookup is reused (default: 3600)
    #[serde(default = "default_badge_ttl_secs")]
    pub badge_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            badge_ttl_secs: default_badge_ttl_secs(),
        }
    }
}

fn default_badge_ttl_secs() -> u64 {
    3600
}

/// Scoring customization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Category weights, each in (0, 1]
    #[serde(default)]
    pub weights: CategoryWeights,

    /// Per-metric rule overrides
    #[serde(default)]
    pub thresholds: BTreeMap<MetricId, ThresholdConfig>,
}

impl HealthConfig {
    /// Connection settings for the data client
    pub fn client_options(&self, token: Option<String>) -> ClientOptions {
        let defaults = ClientOptions::default();
        ClientOptions {
            base_url: self.api.base_url.clone(),
            badge_url: self.api.badge_url.clone(),
            user_agent: self.api.user_agent.clone().unwrap_or(defaults.user_agent),
            token: token.filter(|t| !t.trim().is_empty()),
            per_page: self.api.per_page.clamp(1, 100),
            max_pages: self.api.max_pages.max(1),
            badge_ttl: Duration::from_secs(self.cache.badge_ttl_secs),
        }
    }

    pub fn scoring_engine(&self) -> ScoringEngine {
        ScoringEngine::with_overrides(&self.scoring.thresholds)
    }

    pub fn aggregation_engine(&self) -> AggregationEngine {
        AggregationEngine::new(self.scoring.weights.clone())
    }

    /// Replace out-of-range values with defaults, logging each one
    fn sanitize(mut self) -> Self {
        if !self.scoring.weights.is_valid() {
            warn!(
                "Category weights must each be in (0, 1], using defaults (got {:?})",
                self.scoring.weights
            );
            self.scoring.weights = CategoryWeights::default();
        }
        if self.api.per_page == 0 || self.api.per_page > 100 {
            warn!("per_page must be 1..=100, got {}", self.api.per_page);
            self.api.per_page = default_per_page();
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_ratio) {
            warn!("jitter_ratio must be in [0, 1], got {}", self.retry.jitter_ratio);
            self.retry.jitter_ratio = default_jitter_ratio();
        }
        self
    }
}

/// Load configuration from `dir`.
///
/// Searches for `repohealth.toml`, then `.repohealthrc.json`. A file that
/// fails to parse is logged and skipped. Returns defaults if nothing loads.
pub fn load_health_config(dir: &Path) -> HealthConfig {
    for name in CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if !path.exists() {
            continue;
        }
        match load_config_file(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {:#}", path.display(), e);
            }
        }
    }

    debug!("No config file found, using defaults");
    HealthConfig::default()
}

/// Load an explicit config file; the format follows the extension
pub fn load_config_file(path: &Path) -> anyhow::Result<HealthConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: HealthConfig = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    } else {
        toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))?
    };
    Ok(config.sanitize())
}

/// Starter config written by `repohealth init`
pub const EXAMPLE_CONFIG: &str = r#"# repohealth configuration
# Values shown are the defaults; delete what you don't change.

[api]
base_url = "https://api.github.com"
badge_url = "https://www.bestpractices.dev"
timeout_secs = 30
per_page = 100
max_pages = 5

[retry]
max_attempts = 5
base_delay_ms = 1000
max_delay_ms = 60000
jitter_ratio = 0.3

[cache]
badge_ttl_secs = 3600

[scoring.weights]
activity = 0.25
community = 0.20
maintenance = 0.20
documentation = 0.15
governance = 0.20

# Override the rule for any metric:
#
# [scoring.thresholds.days_since_last_commit]
# kind = "numeric"
# direction = "lower"
# thresholds = [365, 180, 90, 30, 7]
# scores = [0, 20, 50, 80, 100]
#
# [scoring.thresholds.has_codeowners]
# kind = "boolean"
# pass = 100
# fail = 20
"#;

#[cfg(test)]
mod tests;
