//! Threshold rules mapping raw values to scores
//!
//! A rule is checked once, when it is built (or deserialized from a
//! config override). Scoring never has to deal with a malformed rule.
//!
//! ```toml
//! [scoring.thresholds.stars]
//! kind = "numeric"
//! direction = "higher"
//! thresholds = [50, 500, 2000, 8000, 30000]
//! scores = [10, 30, 60, 80, 100]
//!
//! [scoring.thresholds.has_codeowners]
//! kind = "boolean"
//! pass = 100
//! fail = 50
//! ```

use crate::metrics::MetricId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("{thresholds} thresholds but {scores} scores")]
    LengthMismatch { thresholds: usize, scores: usize },

    #[error("a numeric rule needs at least one threshold")]
    NoThresholds,

    #[error("thresholds must be strictly {0}")]
    NotOrdered(&'static str),

    #[error("score {0} is outside [0, 100]")]
    ScoreOutOfRange(f64),

    #[error("threshold values must be finite")]
    NonFinite,

    #[error("categorical rule has no tags")]
    EmptyMapping,
}

/// Which end of the numeric scale is healthy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "higher")]
    HigherIsBetter,
    #[serde(rename = "lower")]
    LowerIsBetter,
}

/// Piecewise-linear rule. Thresholds run worst to best: ascending when
/// higher is better, descending when lower is better. Scores may take any
/// shape; a single point scores every value the same.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericRule {
    direction: Direction,
    thresholds: Vec<f64>,
    scores: Vec<f64>,
}

impl NumericRule {
    pub fn new(
        direction: Direction,
        thresholds: Vec<f64>,
        scores: Vec<f64>,
    ) -> Result<Self, ThresholdError> {
        if thresholds.len() != scores.len() {
            return Err(ThresholdError::LengthMismatch {
                thresholds: thresholds.len(),
                scores: scores.len(),
            });
        }
        if thresholds.is_empty() {
            return Err(ThresholdError::NoThresholds);
        }
        if thresholds.iter().chain(&scores).any(|v| !v.is_finite()) {
            return Err(ThresholdError::NonFinite);
        }
        if let Some(&bad) = scores.iter().find(|s| !(0.0..=100.0).contains(*s)) {
            return Err(ThresholdError::ScoreOutOfRange(bad));
        }
        let ordered = thresholds.windows(2).all(|w| match direction {
            Direction::HigherIsBetter => w[0] < w[1],
            Direction::LowerIsBetter => w[0] > w[1],
        });
        if !ordered {
            return Err(ThresholdError::NotOrdered(match direction {
                Direction::HigherIsBetter => "ascending",
                Direction::LowerIsBetter => "descending",
            }));
        }
        Ok(Self {
            direction,
            thresholds,
            scores,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// Clamp outside the threshold range, interpolate linearly inside it
    pub fn score(&self, value: f64) -> f64 {
        let t = &self.thresholds;
        let s = &self.scores;
        let last = t.len() - 1;

        let (at_or_past_worst, at_or_past_best) = match self.direction {
            Direction::HigherIsBetter => (value <= t[0], value >= t[last]),
            Direction::LowerIsBetter => (value >= t[0], value <= t[last]),
        };
        if at_or_past_worst {
            return s[0];
        }
        if at_or_past_best {
            return s[last];
        }

        for i in 0..last {
            let inside = match self.direction {
                Direction::HigherIsBetter => value < t[i + 1],
                Direction::LowerIsBetter => value > t[i + 1],
            };
            if inside {
                return s[i] + (value - t[i]) / (t[i + 1] - t[i]) * (s[i + 1] - s[i]);
            }
        }
        s[last]
    }
}

/// Fixed scores for true/false signals
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanRule {
    pass: f64,
    fail: f64,
}

impl BooleanRule {
    pub fn new(pass: f64, fail: f64) -> Result<Self, ThresholdError> {
        for score in [pass, fail] {
            if !score.is_finite() {
                return Err(ThresholdError::NonFinite);
            }
            if !(0.0..=100.0).contains(&score) {
                return Err(ThresholdError::ScoreOutOfRange(score));
            }
        }
        Ok(Self { pass, fail })
    }

    pub fn score(&self, value: bool) -> f64 {
        if value {
            self.pass
        } else {
            self.fail
        }
    }
}

/// Tag lookup; tags are matched case-insensitively and unmapped tags score 0
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalRule {
    mapping: BTreeMap<String, f64>,
}

impl CategoricalRule {
    pub fn new(mapping: BTreeMap<String, f64>) -> Result<Self, ThresholdError> {
        if mapping.is_empty() {
            return Err(ThresholdError::EmptyMapping);
        }
        for &score in mapping.values() {
            if !score.is_finite() {
                return Err(ThresholdError::NonFinite);
            }
            if !(0.0..=100.0).contains(&score) {
                return Err(ThresholdError::ScoreOutOfRange(score));
            }
        }
        let mapping = mapping
            .into_iter()
            .map(|(tag, score)| (tag.to_lowercase(), score))
            .collect();
        Ok(Self { mapping })
    }

    pub fn score(&self, tag: &str) -> f64 {
        self.mapping
            .get(&tag.trim().to_lowercase())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn mapping(&self) -> &BTreeMap<String, f64> {
        &self.mapping
    }
}

/// A validated scoring rule for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub enum ThresholdConfig {
    Numeric(NumericRule),
    Boolean(BooleanRule),
    Categorical(CategoricalRule),
}

impl ThresholdConfig {
    pub fn numeric(
        direction: Direction,
        thresholds: Vec<f64>,
        scores: Vec<f64>,
    ) -> Result<Self, ThresholdError> {
        NumericRule::new(direction, thresholds, scores).map(ThresholdConfig::Numeric)
    }

    pub fn boolean(pass: f64, fail: f64) -> Result<Self, ThresholdError> {
        BooleanRule::new(pass, fail).map(ThresholdConfig::Boolean)
    }

    pub fn categorical<'a>(
        pairs: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Self, ThresholdError> {
        let mapping = pairs
            .into_iter()
            .map(|(tag, score)| (tag.to_string(), score))
            .collect();
        CategoricalRule::new(mapping).map(ThresholdConfig::Categorical)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ThresholdConfig::Numeric(_) => "numeric",
            ThresholdConfig::Boolean(_) => "boolean",
            ThresholdConfig::Categorical(_) => "categorical",
        }
    }
}

/// Unvalidated wire form of a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RawRule {
    Numeric {
        #[serde(default)]
        direction: Direction,
        thresholds: Vec<f64>,
        scores: Vec<f64>,
    },
    Boolean {
        pass: f64,
        fail: f64,
    },
    Categorical {
        mapping: BTreeMap<String, f64>,
    },
}

impl TryFrom<RawRule> for ThresholdConfig {
    type Error = ThresholdError;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        match raw {
            RawRule::Numeric {
                direction,
                thresholds,
                scores,
            } => ThresholdConfig::numeric(direction, thresholds, scores),
            RawRule::Boolean { pass, fail } => ThresholdConfig::boolean(pass, fail),
            RawRule::Categorical { mapping } => {
                CategoricalRule::new(mapping).map(ThresholdConfig::Categorical)
            }
        }
    }
}

impl From<ThresholdConfig> for RawRule {
    fn from(rule: ThresholdConfig) -> Self {
        match rule {
            ThresholdConfig::Numeric(r) => RawRule::Numeric {
                direction: r.direction,
                thresholds: r.thresholds,
                scores: r.scores,
            },
            ThresholdConfig::Boolean(r) => RawRule::Boolean {
                pass: r.pass,
                fail: r.fail,
            },
            ThresholdConfig::Categorical(r) => RawRule::Categorical { mapping: r.mapping },
        }
    }
}

// Built-in rules. The tables are checked by `test_default_rules_are_valid`,
// so they are built without going through validation.

fn higher(thresholds: [f64; 5], scores: [f64; 5]) -> ThresholdConfig {
    ThresholdConfig::Numeric(NumericRule {
        direction: Direction::HigherIsBetter,
        thresholds: thresholds.to_vec(),
        scores: scores.to_vec(),
    })
}

fn lower(thresholds: [f64; 5], scores: [f64; 5]) -> ThresholdConfig {
    ThresholdConfig::Numeric(NumericRule {
        direction: Direction::LowerIsBetter,
        thresholds: thresholds.to_vec(),
        scores: scores.to_vec(),
    })
}

fn flag(pass: f64, fail: f64) -> ThresholdConfig {
    ThresholdConfig::Boolean(BooleanRule { pass, fail })
}

fn tags(pairs: &[(&str, f64)]) -> ThresholdConfig {
    ThresholdConfig::Categorical(CategoricalRule {
        mapping: pairs.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
    })
}

/// Built-in rule for a metric
pub fn default_rule(id: MetricId) -> ThresholdConfig {
    use MetricId::*;
    match id {
        CommitFrequency => higher([0.5, 1.0, 3.0, 7.0, 14.0], [10.0, 30.0, 50.0, 75.0, 100.0]),
        DaysSinceLastCommit => lower([365.0, 180.0, 90.0, 30.0, 7.0], [0.0, 20.0, 50.0, 80.0, 100.0]),
        ReleaseCadence => lower([365.0, 180.0, 90.0, 30.0, 14.0], [10.0, 30.0, 60.0, 85.0, 100.0]),
        DaysSinceLastRelease => {
            lower([730.0, 365.0, 180.0, 90.0, 30.0], [0.0, 25.0, 50.0, 75.0, 100.0])
        }
        ContributorCount => higher([1.0, 3.0, 10.0, 25.0, 50.0], [10.0, 30.0, 60.0, 80.0, 100.0]),
        BusFactor => higher([1.0, 2.0, 3.0, 5.0, 8.0], [10.0, 40.0, 60.0, 80.0, 100.0]),
        NewContributors => higher([0.0, 1.0, 3.0, 5.0, 10.0], [20.0, 40.0, 60.0, 80.0, 100.0]),
        Stars => higher(
            [10.0, 100.0, 1000.0, 5000.0, 20000.0],
            [10.0, 30.0, 60.0, 80.0, 100.0],
        ),
        Forks => higher([5.0, 25.0, 100.0, 500.0, 2000.0], [10.0, 30.0, 60.0, 80.0, 100.0]),
        StaleIssueRatio => lower([50.0, 30.0, 20.0, 10.0, 0.0], [0.0, 30.0, 60.0, 80.0, 100.0]),
        IssueCloseRatio => higher([20.0, 40.0, 60.0, 80.0, 90.0], [10.0, 30.0, 60.0, 80.0, 100.0]),
        IssueResolutionDays => lower([90.0, 60.0, 30.0, 14.0, 3.0], [0.0, 30.0, 60.0, 80.0, 100.0]),
        PrMergeRate => higher([20.0, 40.0, 60.0, 80.0, 95.0], [10.0, 30.0, 60.0, 80.0, 100.0]),
        PrMergeDays => lower([30.0, 14.0, 7.0, 3.0, 1.0], [0.0, 30.0, 60.0, 80.0, 100.0]),
        ReadmeLength => higher(
            [500.0, 1500.0, 3000.0, 6000.0, 10000.0],
            [10.0, 40.0, 60.0, 80.0, 100.0],
        ),
        CommunityHealth => higher([20.0, 40.0, 60.0, 80.0, 100.0], [0.0, 25.0, 50.0, 75.0, 100.0]),
        HasReadme | HasContributing | HasCodeOfConduct | HasLicense | HasGovernance => {
            flag(100.0, 0.0)
        }
        HasIssueTemplates => flag(100.0, 30.0),
        HasCodeowners => flag(100.0, 20.0),
        BestPracticesBadge => tags(&[
            ("gold", 100.0),
            ("silver", 90.0),
            ("passing", 75.0),
            ("in_progress", 40.0),
            ("none", 0.0),
        ]),
        FoundationAffiliation => tags(&[
            ("graduated", 100.0),
            ("incubating", 80.0),
            ("sandbox", 60.0),
            ("member", 60.0),
            ("none", 0.0),
        ]),
    }
}

/// Built-in rules for the whole catalog
pub fn default_rules() -> BTreeMap<MetricId, ThresholdConfig> {
    MetricId::ALL
        .into_iter()
        .map(|id| (id, default_rule(id)))
        .collect()
}
