use super::thresholds::{default_rules, ThresholdConfig};
use crate::metrics::MetricId;
use crate::models::{Metric, MetricLevel, RawMetricValue};
use std::collections::BTreeMap;
use tracing::warn;

/// Score assigned when there is not enough data to judge
pub const UNKNOWN_SCORE: f64 = 50.0;

/// Applies threshold rules to raw metric values
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    rules: BTreeMap<MetricId, ThresholdConfig>,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self {
            rules: default_rules(),
        }
    }
}

impl ScoringEngine {
    /// Built-in rules with `overrides` replacing individual metrics
    pub fn with_overrides(overrides: &BTreeMap<MetricId, ThresholdConfig>) -> Self {
        let mut engine = Self::default();
        for (id, rule) in overrides {
            engine.rules.insert(*id, rule.clone());
        }
        engine
    }

    pub fn rule(&self, id: MetricId) -> Option<&ThresholdConfig> {
        self.rules.get(&id)
    }

    /// Score in [0, 100] and its level
    pub fn score(&self, id: MetricId, value: &RawMetricValue) -> (f64, MetricLevel) {
        let score = self.raw_score(id, value).clamp(0.0, 100.0);
        (score, MetricLevel::from_score(score))
    }

    fn raw_score(&self, id: MetricId, value: &RawMetricValue) -> f64 {
        let Some(rule) = self.rules.get(&id) else {
            warn!("No scoring rule for {}, treating as unknown", id);
            return UNKNOWN_SCORE;
        };

        match (rule, value) {
            (_, RawMetricValue::Unknown) => UNKNOWN_SCORE,
            // Number is constructible without going through RawMetricValue::number
            (_, RawMetricValue::Number(v)) if !v.is_finite() => UNKNOWN_SCORE,
            (ThresholdConfig::Numeric(rule), RawMetricValue::Number(v)) => rule.score(*v),
            (ThresholdConfig::Boolean(rule), RawMetricValue::Boolean(b)) => rule.score(*b),
            (ThresholdConfig::Categorical(rule), RawMetricValue::Categorical(tag)) => {
                rule.score(tag)
            }
            (rule, value) => {
                warn!(
                    "{}: {} rule cannot score {:?}, treating as unknown",
                    id,
                    rule.kind(),
                    value
                );
                UNKNOWN_SCORE
            }
        }
    }

    pub fn score_metric(&self, id: MetricId, value: RawMetricValue) -> Metric {
        let (score, level) = self.score(id, &value);
        Metric {
            id,
            category: id.category(),
            display_value: id.display_value(&value),
            raw_value: value,
            score,
            level,
        }
    }

    /// Score every computed value, in catalog order
    pub fn score_all(&self, values: BTreeMap<MetricId, RawMetricValue>) -> Vec<Metric> {
        values
            .into_iter()
            .map(|(id, value)| self.score_metric(id, value))
            .collect()
    }
}
