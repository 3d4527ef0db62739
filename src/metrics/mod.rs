//! Metric catalog
//!
//! Every tracked signal has a stable id, a category and a unit. The unit
//! only affects how raw values are displayed; scoring rules live in
//! [`crate::scoring`].

mod compute;

pub use compute::{MetricComputationEngine, RepoSnapshot};

use crate::models::{CategoryId, RawMetricValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    // Activity
    CommitFrequency,
    DaysSinceLastCommit,
    ReleaseCadence,
    DaysSinceLastRelease,
    // Community
    ContributorCount,
    BusFactor,
    NewContributors,
    Stars,
    Forks,
    // Maintenance
    StaleIssueRatio,
    IssueCloseRatio,
    IssueResolutionDays,
    PrMergeRate,
    PrMergeDays,
    // Documentation
    HasReadme,
    ReadmeLength,
    HasContributing,
    HasCodeOfConduct,
    HasLicense,
    CommunityHealth,
    // Governance
    HasIssueTemplates,
    HasGovernance,
    HasCodeowners,
    BestPracticesBadge,
    FoundationAffiliation,
}

/// How a raw value is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    PerWeek,
    Days,
    Count,
    Percent,
    Chars,
    Flag,
    Tag,
}

impl MetricId {
    pub const ALL: [MetricId; 25] = [
        MetricId::CommitFrequency,
        MetricId::DaysSinceLastCommit,
        MetricId::ReleaseCadence,
        MetricId::DaysSinceLastRelease,
        MetricId::ContributorCount,
        MetricId::BusFactor,
        MetricId::NewContributors,
        MetricId::Stars,
        MetricId::Forks,
        MetricId::StaleIssueRatio,
        MetricId::IssueCloseRatio,
        MetricId::IssueResolutionDays,
        MetricId::PrMergeRate,
        MetricId::PrMergeDays,
        MetricId::HasReadme,
        MetricId::ReadmeLength,
        MetricId::HasContributing,
        MetricId::HasCodeOfConduct,
        MetricId::HasLicense,
        MetricId::CommunityHealth,
        MetricId::HasIssueTemplates,
        MetricId::HasGovernance,
        MetricId::HasCodeowners,
        MetricId::BestPracticesBadge,
        MetricId::FoundationAffiliation,
    ];

    pub fn category(&self) -> CategoryId {
        use MetricId::*;
        match self {
            CommitFrequency | DaysSinceLastCommit | ReleaseCadence | DaysSinceLastRelease => {
                CategoryId::Activity
            }
            ContributorCount | BusFactor | NewContributors | Stars | Forks => {
                CategoryId::Community
            }
            StaleIssueRatio | IssueCloseRatio | IssueResolutionDays | PrMergeRate
            | PrMergeDays => CategoryId::Maintenance,
            HasReadme | ReadmeLength | HasContributing | HasCodeOfConduct | HasLicense
            | CommunityHealth => CategoryId::Documentation,
            HasIssueTemplates | HasGovernance | HasCodeowners | BestPracticesBadge
            | FoundationAffiliation => CategoryId::Governance,
        }
    }

    /// Stable snake_case key, as used in configuration and JSON output
    pub fn key(&self) -> &'static str {
        use MetricId::*;
        match self {
            CommitFrequency => "commit_frequency",
            DaysSinceLastCommit => "days_since_last_commit",
            ReleaseCadence => "release_cadence",
            DaysSinceLastRelease => "days_since_last_release",
            ContributorCount => "contributor_count",
            BusFactor => "bus_factor",
            NewContributors => "new_contributors",
            Stars => "stars",
            Forks => "forks",
            StaleIssueRatio => "stale_issue_ratio",
            IssueCloseRatio => "issue_close_ratio",
            IssueResolutionDays => "issue_resolution_days",
            PrMergeRate => "pr_merge_rate",
            PrMergeDays => "pr_merge_days",
            HasReadme => "has_readme",
            ReadmeLength => "readme_length",
            HasContributing => "has_contributing",
            HasCodeOfConduct => "has_code_of_conduct",
            HasLicense => "has_license",
            CommunityHealth => "community_health",
            HasIssueTemplates => "has_issue_templates",
            HasGovernance => "has_governance",
            HasCodeowners => "has_codeowners",
            BestPracticesBadge => "best_practices_badge",
            FoundationAffiliation => "foundation_affiliation",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        use MetricId::*;
        match self {
            CommitFrequency => "Commit frequency",
            DaysSinceLastCommit => "Last commit",
            ReleaseCadence => "Release cadence",
            DaysSinceLastRelease => "Last release",
            ContributorCount => "Contributors",
            BusFactor => "Bus factor",
            NewContributors => "New contributors (30d)",
            Stars => "Stars",
            Forks => "Forks",
            StaleIssueRatio => "Stale issues",
            IssueCloseRatio => "Issues closed",
            IssueResolutionDays => "Issue resolution time",
            PrMergeRate => "PR merge rate",
            PrMergeDays => "PR merge time",
            HasReadme => "README",
            ReadmeLength => "README length",
            HasContributing => "Contributing guide",
            HasCodeOfConduct => "Code of conduct",
            HasLicense => "License",
            CommunityHealth => "Community profile",
            HasIssueTemplates => "Issue templates",
            HasGovernance => "Governance docs",
            HasCodeowners => "CODEOWNERS",
            BestPracticesBadge => "Best-practices badge",
            FoundationAffiliation => "Foundation",
        }
    }

    pub fn unit(&self) -> Unit {
        use MetricId::*;
        match self {
            CommitFrequency => Unit::PerWeek,
            DaysSinceLastCommit | ReleaseCadence | DaysSinceLastRelease | IssueResolutionDays
            | PrMergeDays => Unit::Days,
            ContributorCount | BusFactor | NewContributors | Stars | Forks => Unit::Count,
            StaleIssueRatio | IssueCloseRatio | PrMergeRate | CommunityHealth => Unit::Percent,
            ReadmeLength => Unit::Chars,
            HasReadme | HasContributing | HasCodeOfConduct | HasLicense | HasIssueTemplates
            | HasGovernance | HasCodeowners => Unit::Flag,
            BestPracticesBadge | FoundationAffiliation => Unit::Tag,
        }
    }

    /// Format a raw value for display in reports
    pub fn display_value(&self, value: &RawMetricValue) -> String {
        match value {
            RawMetricValue::Unknown => "unknown".to_string(),
            RawMetricValue::Boolean(b) => (if *b { "yes" } else { "no" }).to_string(),
            RawMetricValue::Categorical(tag) => tag.clone(),
            RawMetricValue::Number(v) => match self.unit() {
                Unit::PerWeek => format!("{v:.1}/week"),
                Unit::Days => {
                    let days = v.round();
                    if days == 1.0 {
                        "1 day".to_string()
                    } else {
                        format!("{days:.0} days")
                    }
                }
                Unit::Percent => format!("{v:.1}%"),
                Unit::Chars => format!("{v:.0} chars"),
                Unit::Count | Unit::Flag | Unit::Tag => format!("{v:.0}"),
            },
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MetricId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricId::ALL
            .into_iter()
            .find(|id| id.key() == s)
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_category() {
        for category in CategoryId::ALL {
            assert!(
                MetricId::ALL.iter().any(|m| m.category() == category),
                "no metric in {category}"
            );
        }
        assert_eq!(
            MetricId::ALL
                .iter()
                .filter(|m| m.category() == CategoryId::Governance)
                .count(),
            5
        );
    }

    #[test]
    fn test_key_matches_serde_name() {
        for id in MetricId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.key()));
            assert_eq!(id.key().parse::<MetricId>().unwrap(), id);
        }
        assert!("bogus".parse::<MetricId>().is_err());
    }

    #[test]
    fn test_display_values() {
        let n = RawMetricValue::Number;
        assert_eq!(MetricId::CommitFrequency.display_value(&n(10.11)), "10.1/week");
        assert_eq!(MetricId::DaysSinceLastCommit.display_value(&n(1.2)), "1 day");
        assert_eq!(MetricId::DaysSinceLastCommit.display_value(&n(12.0)), "12 days");
        assert_eq!(MetricId::StaleIssueRatio.display_value(&n(25.0)), "25.0%");
        assert_eq!(MetricId::Stars.display_value(&n(1234.0)), "1234");
        assert_eq!(
            MetricId::HasLicense.display_value(&RawMetricValue::Boolean(true)),
            "yes"
        );
        assert_eq!(
            MetricId::BestPracticesBadge.display_value(&RawMetricValue::categorical("gold")),
            "gold"
        );
        assert_eq!(
            MetricId::ReleaseCadence.display_value(&RawMetricValue::Unknown),
            "unknown"
        );
    }
}
