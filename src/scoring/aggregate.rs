use crate::models::{Category, CategoryId, Grade, HealthScore, Metric, Summary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Category scores at or above this are strengths
const STRENGTH_THRESHOLD: f64 = 75.0;
/// Category scores below this need improvement
const IMPROVEMENT_THRESHOLD: f64 = 50.0;
const SUMMARY_LIMIT: usize = 3;

/// Relative weight of each category in the overall score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    /// Weight for activity (default: 0.25)
    #[serde(default = "default_activity_weight")]
    pub activity: f64,

    /// Weight for community (default: 0.20)
    #[serde(default = "default_community_weight")]
    pub community: f64,

    /// Weight for maintenance (default: 0.20)
    #[serde(default = "default_maintenance_weight")]
    pub maintenance: f64,

    /// Weight for documentation (default: 0.15)
    #[serde(default = "default_documentation_weight")]
    pub documentation: f64,

    /// Weight for governance (default: 0.20)
    #[serde(default = "default_governance_weight")]
    pub governance: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            activity: default_activity_weight(),
            community: default_community_weight(),
            maintenance: default_maintenance_weight(),
            documentation: default_documentation_weight(),
            governance: default_governance_weight(),
        }
    }
}

fn default_activity_weight() -> f64 {
    0.25
}
fn default_community_weight() -> f64 {
    0.20
}
fn default_maintenance_weight() -> f64 {
    0.20
}
fn default_documentation_weight() -> f64 {
    0.15
}
fn default_governance_weight() -> f64 {
    0.20
}

impl CategoryWeights {
    pub fn weight(&self, category: CategoryId) -> f64 {
        match category {
            CategoryId::Activity => self.activity,
            CategoryId::Community => self.community,
            CategoryId::Maintenance => self.maintenance,
            CategoryId::Documentation => self.documentation,
            CategoryId::Governance => self.governance,
        }
    }

    /// Every weight must be in (0, 1]
    pub fn is_valid(&self) -> bool {
        CategoryId::ALL
            .iter()
            .all(|c| self.weight(*c) > 0.0 && self.weight(*c) <= 1.0)
    }
}

/// Folds scored metrics into category scores, an overall score and a summary
#[derive(Debug, Clone, Default)]
pub struct AggregationEngine {
    weights: CategoryWeights,
}

impl AggregationEngine {
    pub fn new(weights: CategoryWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &CategoryWeights {
        &self.weights
    }

    pub fn aggregate(&self, metrics: Vec<Metric>) -> HealthScore {
        let mut grouped: BTreeMap<CategoryId, Vec<Metric>> =
            CategoryId::ALL.iter().map(|c| (*c, Vec::new())).collect();
        for metric in metrics {
            grouped.entry(metric.category).or_default().push(metric);
        }

        let categories: BTreeMap<CategoryId, Category> = grouped
            .into_iter()
            .map(|(id, metrics)| (id, self.build_category(id, metrics)))
            .collect();

        // Empty categories carry no information; they neither pull the
        // overall score down nor count toward the weight total.
        let (weighted, total_weight) = categories
            .values()
            .filter(|c| !c.is_empty())
            .fold((0.0, 0.0), |(sum, weights), c| {
                (sum + c.score * c.weight, weights + c.weight)
            });
        let overall_score = if total_weight > 0.0 {
            (weighted / total_weight).clamp(0.0, 100.0)
        } else {
            0.0
        };
        let overall_grade = Grade::from_score(overall_score);

        debug!(
            "Overall {:.1} ({}) from {} non-empty categories",
            overall_score,
            overall_grade,
            categories.values().filter(|c| !c.is_empty()).count()
        );

        let summary = summarize(overall_score, &categories);
        HealthScore {
            overall_score,
            overall_grade,
            categories,
            summary,
        }
    }

    fn build_category(&self, id: CategoryId, metrics: Vec<Metric>) -> Category {
        let score = if metrics.is_empty() {
            0.0
        } else {
            metrics.iter().map(|m| m.score).sum::<f64>() / metrics.len() as f64
        };
        Category {
            id,
            name: id.name().to_string(),
            weight: self.weights.weight(id),
            metrics,
            score,
            grade: Grade::from_score(score),
        }
    }
}

fn summarize(overall: f64, categories: &BTreeMap<CategoryId, Category>) -> Summary {
    let scored: Vec<&Category> = categories.values().filter(|c| !c.is_empty()).collect();

    // Stable sorts keep category order on ties
    let mut strengths: Vec<&Category> = scored
        .iter()
        .copied()
        .filter(|c| c.score >= STRENGTH_THRESHOLD)
        .collect();
    strengths.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut improvements: Vec<&Category> = scored
        .iter()
        .copied()
        .filter(|c| c.score < IMPROVEMENT_THRESHOLD)
        .collect();
    improvements.sort_by(|a, b| a.score.total_cmp(&b.score));

    let strengths: Vec<CategoryId> = strengths.iter().take(SUMMARY_LIMIT).map(|c| c.id).collect();
    let improvements: Vec<CategoryId> = improvements
        .iter()
        .take(SUMMARY_LIMIT)
        .map(|c| c.id)
        .collect();

    let mut text = match overall {
        s if s >= 80.0 => "Excellent health: the project is active, well documented and well governed.",
        s if s >= 60.0 => "Good health, with a few areas that could use attention.",
        s if s >= 40.0 => "Fair health: several signals suggest the project needs more care.",
        _ => "Poor health: the project shows significant signs of neglect or risk.",
    }
    .to_string();

    if !strengths.is_empty() {
        text.push_str(&format!(" Strongest areas: {}.", join_names(&strengths)));
    }
    if !improvements.is_empty() {
        text.push_str(&format!(" Needs attention: {}.", join_names(&improvements)));
    }

    Summary {
        text,
        strengths,
        improvements,
    }
}

fn join_names(ids: &[CategoryId]) -> String {
    ids.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricId;
    use crate::models::{MetricLevel, RawMetricValue};

    fn metric(id: MetricId, score: f64) -> Metric {
        Metric {
            id,
            category: id.category(),
            raw_value: RawMetricValue::Unknown,
            score,
            level: MetricLevel::from_score(score),
            display_value: String::new(),
        }
    }

    #[test]
    fn test_category_mean() {
        let health = AggregationEngine::default().aggregate(vec![
            metric(MetricId::Stars, 100.0),
            metric(MetricId::Forks, 50.0),
            metric(MetricId::BusFactor, 30.0),
        ]);
        let community = &health.categories[&CategoryId::Community];
        assert_eq!(community.score, 60.0);
        assert_eq!(community.grade, Grade::D);
        assert_eq!(community.metrics.len(), 3);
        assert_eq!(community.weight, 0.20);
    }

    #[test]
    fn test_empty_categories_are_excluded() {
        let health = AggregationEngine::default().aggregate(vec![
            metric(MetricId::CommitFrequency, 80.0),
            metric(MetricId::DaysSinceLastCommit, 80.0),
        ]);
        assert_eq!(health.overall_score, 80.0);
        assert_eq!(health.overall_grade, Grade::B);
        assert_eq!(health.categories.len(), 5);
        assert!(health.categories[&CategoryId::Governance].is_empty());
        assert_eq!(health.categories[&CategoryId::Governance].score, 0.0);
        assert!(!health.summary.improvements.contains(&CategoryId::Governance));
    }

    #[test]
    fn test_equal_scores_ignore_weights() {
        let weights = CategoryWeights {
            activity: 0.9,
            community: 0.01,
            maintenance: 0.05,
            documentation: 0.02,
            governance: 0.02,
        };
        let metrics = MetricId::ALL.iter().map(|id| metric(*id, 50.0)).collect();
        let health = AggregationEngine::new(weights).aggregate(metrics);
        assert!((health.overall_score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_overall() {
        let health = AggregationEngine::default().aggregate(vec![
            metric(MetricId::CommitFrequency, 100.0),
            metric(MetricId::HasReadme, 0.0),
        ]);
        // (100 * 0.25 + 0 * 0.15) / 0.40
        assert!((health.overall_score - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_metrics() {
        let health = AggregationEngine::default().aggregate(Vec::new());
        assert_eq!(health.overall_score, 0.0);
        assert_eq!(health.overall_grade, Grade::F);
        assert!(health.summary.strengths.is_empty());
        assert!(health.summary.improvements.is_empty());
    }

    #[test]
    fn test_summary_strengths_and_improvements() {
        let health = AggregationEngine::default().aggregate(vec![
            metric(MetricId::CommitFrequency, 90.0),
            metric(MetricId::Stars, 80.0),
            metric(MetricId::StaleIssueRatio, 80.0),
            metric(MetricId::HasReadme, 20.0),
            metric(MetricId::HasGovernance, 40.0),
        ]);
        assert_eq!(
            health.summary.strengths,
            vec![CategoryId::Activity, CategoryId::Community, CategoryId::Maintenance]
        );
        assert_eq!(
            health.summary.improvements,
            vec![CategoryId::Documentation, CategoryId::Governance]
        );
        assert!(health.summary.text.contains("Strongest areas: Activity, Community, Maintenance."));
        assert!(health.summary.text.contains("Needs attention: Documentation, Governance."));
    }

    #[test]
    fn test_summary_bands() {
        let text = |score| {
            AggregationEngine::default()
                .aggregate(vec![metric(MetricId::Stars, score)])
                .summary
                .text
        };
        assert!(text(85.0).starts_with("Excellent"));
        assert!(text(65.0).starts_with("Good"));
        assert!(text(45.0).starts_with("Fair"));
        assert!(text(10.0).starts_with("Poor"));
    }

    #[test]
    fn test_weights_validation() {
        assert!(CategoryWeights::default().is_valid());
        let bad = CategoryWeights {
            governance: 0.0,
            ..Default::default()
        };
        assert!(!bad.is_valid());
    }
}
