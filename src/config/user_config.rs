//! User-level credentials for repohealth
//!
//! The API token is resolved with priority:
//! 1. `--token` flag or `GITHUB_TOKEN` (handled by clap)
//! 2. User config (~/.config/repohealth/config.toml)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub github: GithubCredentials,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GithubCredentials {
    /// Personal access token; raises the rate limit from 60 to 5000 requests/hour
    pub token: Option<String>,
}

impl UserConfig {
    /// Load the user config, or defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::user_config_path().filter(|p| p.exists()) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?;
        debug!("Loaded user config from {}", path.display());
        Ok(config)
    }

    /// Get the user config directory path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("repohealth").join("config.toml"))
    }

    /// The explicit token if given, else the stored one. Blank tokens count as none.
    pub fn resolve_token(&self, explicit: Option<String>) -> Option<String> {
        let present = |t: &String| !t.trim().is_empty();
        explicit
            .filter(present)
            .or_else(|| self.github.token.clone().filter(present))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_token() {
        let config = UserConfig::default();
        assert_eq!(config.resolve_token(None), None);
        assert_eq!(config.resolve_token(Some("abc".into())).as_deref(), Some("abc"));
    }

    #[test]
    fn test_explicit_token_wins() {
        let config: UserConfig = toml::from_str("[github]\ntoken = \"stored\"\n").unwrap();
        assert_eq!(config.resolve_token(None).as_deref(), Some("stored"));
        assert_eq!(
            config.resolve_token(Some("flag".into())).as_deref(),
            Some("flag")
        );
    }

    #[test]
    fn test_blank_explicit_token_falls_back_to_stored() {
        let config: UserConfig = toml::from_str("[github]\ntoken = \"stored\"\n").unwrap();
        assert_eq!(config.resolve_token(Some("".into())).as_deref(), Some("stored"));
        assert_eq!(config.resolve_token(Some("  ".into())).as_deref(), Some("stored"));

        let empty: UserConfig = toml::from_str("[github]\ntoken = \" \"\n").unwrap();
        assert_eq!(empty.resolve_token(Some("".into())), None);
        assert_eq!(empty.resolve_token(None), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[github]\ntoken = \"ghp_test\"\n").unwrap();

        let config = UserConfig::load_from(&path).unwrap();
        assert_eq!(config.github.token.as_deref(), Some("ghp_test"));

        std::fs::write(&path, "[github\n").unwrap();
        assert!(UserConfig::load_from(&path).is_err());
    }
}
