//! Init command - write a starter repohealth.toml

use anyhow::{Context, Result};
use console::style;
use repohealth::config::EXAMPLE_CONFIG;
use std::path::{Path, PathBuf};

/// Run the init command
pub fn run(path: &Path, force: bool) -> Result<()> {
    let dir = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    if !dir.is_dir() {
        anyhow::bail!("Path is not a directory: {}", dir.display());
    }

    let config_path = write_config(&dir, force)?;
    match config_path {
        Some(config_path) => println!(
            "{} Created {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        ),
        None => {
            println!(
                "{} Config already exists at {} (use --force to overwrite)",
                style("✓").green(),
                style(dir.join("repohealth.toml").display()).cyan()
            );
            return Ok(());
        }
    }

    println!("\nNext steps:");
    println!("  {} Evaluate a repository", style("repohealth evaluate owner/repo").cyan());
    println!(
        "  {} Raise the API rate limit",
        style("export GITHUB_TOKEN=...").cyan()
    );

    Ok(())
}

/// Write the example config; `None` if one exists and `force` is off
fn write_config(dir: &Path, force: bool) -> Result<Option<PathBuf>> {
    let config_path = dir.join("repohealth.toml");
    if config_path.exists() && !force {
        return Ok(None);
    }
    std::fs::write(&config_path, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(Some(config_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use repohealth::config::{load_health_config, HealthConfig};

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_config(dir.path(), false).unwrap();
        assert_eq!(written, Some(dir.path().join("repohealth.toml")));
        assert_eq!(load_health_config(dir.path()), HealthConfig::default());
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repohealth.toml");
        std::fs::write(&path, "[api]\nmax_pages = 1\n").unwrap();

        assert_eq!(write_config(dir.path(), false).unwrap(), None);
        assert_eq!(load_health_config(dir.path()).api.max_pages, 1);

        assert!(write_config(dir.path(), true).unwrap().is_some());
        assert_eq!(load_health_config(dir.path()).api.max_pages, 5);
    }
}
