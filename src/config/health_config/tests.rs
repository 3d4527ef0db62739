use super::*;
use crate::scoring::Direction;
use std::io::Write;

#[test]
fn test_default_config() {
    let config = HealthConfig::default();
    assert_eq!(config.api.base_url, "https://api.github.com");
    assert_eq!(config.api.per_page, 100);
    assert_eq!(config.api.max_pages, 5);
    assert_eq!(config.retry.policy(), RetryPolicy::default());
    assert_eq!(config.cache.badge_ttl_secs, 3600);
    assert!(config.scoring.weights.is_valid());
    assert!(config.scoring.thresholds.is_empty());
}

#[test]
fn test_example_config_matches_defaults() {
    let config: HealthConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
    assert_eq!(config, HealthConfig::default());
}

#[test]
fn test_parse_toml_config() {
    let toml_content = r#"
[api]
base_url = "https://ghe.example.com/api/v3"
per_page = 50

[retry]
max_attempts = 2
base_delay_ms = 10

[scoring.weights]
activity = 0.5

[scoring.thresholds.stars]
kind = "numeric"
thresholds = [1, 10]
scores = [0, 100]

[scoring.thresholds.has_codeowners]
kind = "boolean"
pass = 100
fail = 50
"#;

    let config: HealthConfig = toml::from_str(toml_content).unwrap();

    assert_eq!(config.api.base_url, "https://ghe.example.com/api/v3");
    assert_eq!(config.api.per_page, 50);
    assert_eq!(config.api.max_pages, 5);

    let policy = config.retry.policy();
    assert_eq!(policy.max_attempts, 2);
    assert_eq!(policy.base_delay, Duration::from_millis(10));
    assert_eq!(policy.max_delay, Duration::from_millis(60_000));

    assert_eq!(config.scoring.weights.activity, 0.5);
    assert_eq!(config.scoring.weights.community, 0.20);

    let ThresholdConfig::Numeric(stars) = &config.scoring.thresholds[&MetricId::Stars] else {
        panic!("stars override should be numeric");
    };
    assert_eq!(stars.direction(), Direction::HigherIsBetter);
    assert_eq!(stars.score(5.5), 50.0);
    assert!(config
        .scoring
        .thresholds
        .contains_key(&MetricId::HasCodeowners));
}

#[test]
fn test_invalid_threshold_fails_to_parse() {
    let toml_content = r#"
[scoring.thresholds.stars]
kind = "numeric"
thresholds = [10, 1]
scores = [0, 100]
"#;
    assert!(toml::from_str::<HealthConfig>(toml_content).is_err());
}

#[test]
fn test_unknown_metric_fails_to_parse() {
    let toml_content = r#"
[scoring.thresholds.lines_of_code]
kind = "boolean"
pass = 100
fail = 0
"#;
    assert!(toml::from_str::<HealthConfig>(toml_content).is_err());
}

#[test]
fn test_client_options_from_config() {
    let mut config = HealthConfig::default();
    config.api.user_agent = Some("ci-bot/1.0".to_string());
    config.cache.badge_ttl_secs = 60;

    let options = config.client_options(Some("tok".to_string()));
    assert_eq!(options.user_agent, "ci-bot/1.0");
    assert_eq!(options.token.as_deref(), Some("tok"));
    assert_eq!(options.badge_ttl, Duration::from_secs(60));

    assert_eq!(config.client_options(Some("  ".to_string())).token, None);
    assert!(HealthConfig::default()
        .client_options(None)
        .user_agent
        .starts_with("repohealth/"));
}

#[test]
fn test_load_prefers_toml_then_json() {
    let dir = tempfile::tempdir().unwrap();

    assert_eq!(load_health_config(dir.path()), HealthConfig::default());

    std::fs::write(
        dir.path().join(".repohealthrc.json"),
        r#"{"api": {"max_pages": 2}}"#,
    )
    .unwrap();
    assert_eq!(load_health_config(dir.path()).api.max_pages, 2);

    std::fs::write(dir.path().join("repohealth.toml"), "[api]\nmax_pages = 3\n").unwrap();
    assert_eq!(load_health_config(dir.path()).api.max_pages, 3);
}

#[test]
fn test_broken_toml_falls_back_to_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("repohealth.toml"), "[api\nmax_pages = ").unwrap();
    std::fs::write(
        dir.path().join(".repohealthrc.json"),
        r#"{"retry": {"max_attempts": 1}}"#,
    )
    .unwrap();

    let config = load_health_config(dir.path());
    assert_eq!(config.retry.max_attempts, 1);
}

#[test]
fn test_load_config_file_reports_errors() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[retry]\nmax_attempts = \"many\"").unwrap();

    let err = load_config_file(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Invalid TOML"));

    assert!(load_config_file(Path::new("/nonexistent/repohealth.toml")).is_err());
}

#[test]
fn test_out_of_range_values_are_sanitized() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "[api]\nper_page = 500\n\n[retry]\njitter_ratio = 4.0\n\n[scoring.weights]\nactivity = -1.0"
    )
    .unwrap();

    let config = load_config_file(file.path()).unwrap();
    assert_eq!(config.api.per_page, 100);
    assert_eq!(config.retry.jitter_ratio, 0.3);
    assert_eq!(config.scoring.weights, CategoryWeights::default());
}
