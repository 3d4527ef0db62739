//! Core data models for repohealth
//!
//! These models are produced fresh for every evaluation and are never
//! mutated once scoring and aggregation have run.

use crate::metrics::MetricId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw value of a signal before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RawMetricValue {
    Number(f64),
    Boolean(bool),
    Categorical(String),
    /// Missing or insufficient data
    Unknown,
}

impl RawMetricValue {
    pub fn is_unknown(&self) -> bool {
        matches!(self, RawMetricValue::Unknown)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawMetricValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Build a numeric value, treating NaN/infinite as missing data
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            RawMetricValue::Number(value)
        } else {
            RawMetricValue::Unknown
        }
    }

    pub fn categorical(tag: impl Into<String>) -> Self {
        RawMetricValue::Categorical(tag.into())
    }
}

/// Qualitative level of a single metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricLevel {
    Critical,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl MetricLevel {
    /// Fixed score bands: >=80 Excellent, >=60 Good, >=40 Fair, >=20 Poor
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 80.0 => MetricLevel::Excellent,
            s if s >= 60.0 => MetricLevel::Good,
            s if s >= 40.0 => MetricLevel::Fair,
            s if s >= 20.0 => MetricLevel::Poor,
            _ => MetricLevel::Critical,
        }
    }
}

impl std::fmt::Display for MetricLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricLevel::Excellent => write!(f, "Excellent"),
            MetricLevel::Good => write!(f, "Good"),
            MetricLevel::Fair => write!(f, "Fair"),
            MetricLevel::Poor => write!(f, "Poor"),
            MetricLevel::Critical => write!(f, "Critical"),
        }
    }
}

/// Letter grade for category and overall scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    F,
    D,
    C,
    B,
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 97.0 => Grade::APlus,
            s if s >= 90.0 => Grade::A,
            s if s >= 80.0 => Grade::B,
            s if s >= 70.0 => Grade::C,
            s if s >= 60.0 => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signal grouping. Declaration order is the display order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CategoryId {
    Activity,
    Community,
    Maintenance,
    Documentation,
    Governance,
}

impl CategoryId {
    pub const ALL: [CategoryId; 5] = [
        CategoryId::Activity,
        CategoryId::Community,
        CategoryId::Maintenance,
        CategoryId::Documentation,
        CategoryId::Governance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CategoryId::Activity => "Activity",
            CategoryId::Community => "Community",
            CategoryId::Maintenance => "Maintenance",
            CategoryId::Documentation => "Documentation",
            CategoryId::Governance => "Governance",
        }
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A scored signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub id: MetricId,
    pub category: CategoryId,
    pub raw_value: RawMetricValue,
    /// Score in [0, 100]
    pub score: f64,
    pub level: MetricLevel,
    pub display_value: String,
}

/// A weighted group of metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Relative weight in (0, 1]
    pub weight: f64,
    pub metrics: Vec<Metric>,
    pub score: f64,
    pub grade: Grade,
}

impl Category {
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Narrative summary of an evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    /// At most three categories scoring >= 75, best first
    pub strengths: Vec<CategoryId>,
    /// At most three categories scoring < 50, worst first
    pub improvements: Vec<CategoryId>,
}

/// Overall health of a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthScore {
    pub overall_score: f64,
    pub overall_grade: Grade,
    pub categories: BTreeMap<CategoryId, Category>,
    pub summary: Summary,
}
