//! Configuration module for repohealth
//!
//! This module handles:
//! - Evaluation configuration (repohealth.toml)
//! - Threshold and weight overrides
//! - User-level API credentials

mod health_config;
mod user_config;

pub use health_config::{
    load_config_file, load_health_config, ApiConfig, CacheConfig, HealthConfig, RetryConfig,
    ScoringConfig, CONFIG_FILE_NAMES, EXAMPLE_CONFIG,
};
pub use user_config::{GithubCredentials, UserConfig};
