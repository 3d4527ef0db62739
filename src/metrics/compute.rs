//! Raw metric computation from a resolved repository snapshot

use super::MetricId;
use crate::api::foundation::FoundationTier;
use crate::api::types::{
    Commit, CommunityProfile, Contributor, GovernanceFiles, Issue, PullRequest, Release,
    Repository,
};
use crate::models::RawMetricValue;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};

/// Everything fetched for one repository. Absent optional resources are
/// `None`; the lists are whatever the API returned within its page limit.
#[derive(Debug, Clone, Default)]
pub struct RepoSnapshot {
    pub repository: Repository,
    /// Commits inside the activity window
    pub commits: Vec<Commit>,
    pub contributors: Vec<Contributor>,
    /// Issues in every state, pull requests already filtered out
    pub issues: Vec<Issue>,
    /// Currently open issues, fetched on their own so old open issues are
    /// not cut off by the page limit of `issues`
    pub open_issues: Vec<Issue>,
    /// Pull requests in every state
    pub pull_requests: Vec<PullRequest>,
    pub releases: Vec<Release>,
    pub community: Option<CommunityProfile>,
    pub readme: Option<String>,
    pub governance: GovernanceFiles,
    pub badge: Option<String>,
    pub foundation: Option<FoundationTier>,
}

/// Turns a snapshot into one raw value per metric
#[derive(Debug, Clone)]
pub struct MetricComputationEngine {
    pub window_days: i64,
    pub stale_after_days: i64,
    pub new_contributor_days: i64,
    pub release_sample: usize,
}

impl Default for MetricComputationEngine {
    fn default() -> Self {
        Self {
            window_days: 90,
            stale_after_days: 90,
            new_contributor_days: 30,
            release_sample: 5,
        }
    }
}

impl MetricComputationEngine {
    /// Start of the commit window for an evaluation at `now`
    pub fn since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.window_days)
    }

    /// Compute every metric in the catalog. Pure: the same snapshot and
    /// clock always give the same values.
    pub fn compute(
        &self,
        snapshot: &RepoSnapshot,
        now: DateTime<Utc>,
    ) -> BTreeMap<MetricId, RawMetricValue> {
        let mut results = BTreeMap::new();
        let mut calc = Calculator {
            engine: self,
            snapshot,
            now,
            results: &mut results,
        };

        calc.commit_frequency();
        calc.days_since_last_commit();
        calc.release_cadence();
        calc.days_since_last_release();

        calc.contributor_count();
        calc.bus_factor();
        calc.new_contributors();
        calc.popularity();

        calc.stale_issue_ratio();
        calc.issue_close_ratio();
        calc.issue_resolution_days();
        calc.pr_merge_rate();
        calc.pr_merge_days();

        calc.readme();
        calc.community_files();

        calc.governance();
        calc.best_practices_badge();
        calc.foundation_affiliation();

        results
    }
}

struct Calculator<'a> {
    engine: &'a MetricComputationEngine,
    snapshot: &'a RepoSnapshot,
    now: DateTime<Utc>,
    results: &'a mut BTreeMap<MetricId, RawMetricValue>,
}

impl Calculator<'_> {
    fn set(&mut self, id: MetricId, value: RawMetricValue) {
        self.results.insert(id, value);
    }

    fn days_before_now(&self, then: DateTime<Utc>) -> f64 {
        days_between(then, self.now).max(0.0)
    }

    fn commit_frequency(&mut self) {
        let since = self.engine.since(self.now);
        let in_window = self
            .snapshot
            .commits
            .iter()
            .filter(|c| c.date().is_some_and(|d| d >= since))
            .count();
        let weeks = self.engine.window_days as f64 / 7.0;
        self.set(
            MetricId::CommitFrequency,
            RawMetricValue::number(in_window as f64 / weeks),
        );
    }

    /// Falls back to the last push when no commit falls in the window
    fn days_since_last_commit(&mut self) {
        let latest = self
            .snapshot
            .commits
            .iter()
            .filter_map(Commit::date)
            .max()
            .or(self.snapshot.repository.pushed_at);
        let value = match latest {
            Some(date) => RawMetricValue::number(self.days_before_now(date)),
            None => RawMetricValue::Unknown,
        };
        self.set(MetricId::DaysSinceLastCommit, value);
    }

    fn release_dates(&self) -> Vec<DateTime<Utc>> {
        let mut dates: Vec<_> = self
            .snapshot
            .releases
            .iter()
            .filter(|r| !r.draft)
            .filter_map(Release::date)
            .collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates
    }

    /// Mean gap between the most recent releases
    fn release_cadence(&mut self) {
        let dates = self.release_dates();
        let recent = &dates[..dates.len().min(self.engine.release_sample)];
        let value = if recent.len() < 2 {
            RawMetricValue::Unknown
        } else {
            let gaps: Vec<f64> = recent
                .windows(2)
                .map(|pair| days_between(pair[1], pair[0]))
                .collect();
            RawMetricValue::number(mean(&gaps))
        };
        self.set(MetricId::ReleaseCadence, value);
    }

    fn days_since_last_release(&mut self) {
        let value = match self.release_dates().first() {
            Some(&latest) => RawMetricValue::number(self.days_before_now(latest)),
            None => RawMetricValue::Unknown,
        };
        self.set(MetricId::DaysSinceLastRelease, value);
    }

    fn contributor_count(&mut self) {
        let count = self.snapshot.contributors.len();
        self.set(MetricId::ContributorCount, RawMetricValue::number(count as f64));
    }

    fn bus_factor(&mut self) {
        let counts: Vec<u64> = self
            .snapshot
            .contributors
            .iter()
            .map(|c| c.contributions)
            .collect();
        self.set(
            MetricId::BusFactor,
            RawMetricValue::number(bus_factor(&counts) as f64),
        );
    }

    /// Authors whose earliest commit in the window is recent. Anyone whose
    /// first commit predates the window but who came back recently counts
    /// as new; the commit window is all we fetch.
    fn new_contributors(&mut self) {
        let mut first_seen: HashMap<String, DateTime<Utc>> = HashMap::new();
        for commit in &self.snapshot.commits {
            let (Some(author), Some(date)) = (commit.author_key(), commit.date()) else {
                continue;
            };
            first_seen
                .entry(author)
                .and_modify(|d| *d = (*d).min(date))
                .or_insert(date);
        }

        let cutoff = self.now - Duration::days(self.engine.new_contributor_days);
        let count = first_seen.values().filter(|d| **d >= cutoff).count();
        self.set(MetricId::NewContributors, RawMetricValue::number(count as f64));
    }

    fn popularity(&mut self) {
        let repo = &self.snapshot.repository;
        let (stars, forks) = (repo.stargazers_count as f64, repo.forks_count as f64);
        self.set(MetricId::Stars, RawMetricValue::number(stars));
        self.set(MetricId::Forks, RawMetricValue::number(forks));
    }

    fn stale_issue_ratio(&mut self) {
        let cutoff = self.now - Duration::days(self.engine.stale_after_days);
        let open: Vec<&Issue> = self
            .snapshot
            .open_issues
            .iter()
            .filter(|i| i.is_open())
            .collect();
        let ratio = if open.is_empty() {
            0.0
        } else {
            let stale = open.iter().filter(|i| i.updated_at < cutoff).count();
            stale as f64 / open.len() as f64 * 100.0
        };
        self.set(MetricId::StaleIssueRatio, RawMetricValue::number(ratio));
    }

    fn issue_close_ratio(&mut self) {
        let total = self.snapshot.issues.len();
        let closed = self.snapshot.issues.iter().filter(|i| !i.is_open()).count();
        let value = if total == 0 {
            RawMetricValue::Unknown
        } else {
            RawMetricValue::number(closed as f64 / total as f64 * 100.0)
        };
        self.set(MetricId::IssueCloseRatio, value);
    }

    fn issue_resolution_days(&mut self) {
        let durations: Vec<f64> = self
            .snapshot
            .issues
            .iter()
            .filter_map(|i| i.closed_at.map(|closed| days_between(i.created_at, closed)))
            .collect();
        self.set(MetricId::IssueResolutionDays, mean_or_unknown(&durations));
    }

    fn pr_merge_rate(&mut self) {
        let prs = &self.snapshot.pull_requests;
        let merged = prs.iter().filter(|p| p.is_merged()).count();
        let rejected = prs.iter().filter(|p| p.is_closed_unmerged()).count();
        let value = match merged + rejected {
            0 => RawMetricValue::Unknown,
            total => RawMetricValue::number(merged as f64 / total as f64 * 100.0),
        };
        self.set(MetricId::PrMergeRate, value);
    }

    fn pr_merge_days(&mut self) {
        let durations: Vec<f64> = self
            .snapshot
            .pull_requests
            .iter()
            .filter_map(|p| p.merged_at.map(|merged| days_between(p.created_at, merged)))
            .collect();
        self.set(MetricId::PrMergeDays, mean_or_unknown(&durations));
    }

    fn readme(&mut self) {
        let readme = self.snapshot.readme.as_deref();
        let length = readme.map_or(0, |r| r.trim().chars().count());
        self.set(MetricId::HasReadme, RawMetricValue::Boolean(readme.is_some()));
        self.set(MetricId::ReadmeLength, RawMetricValue::number(length as f64));
    }

    /// Community profile flags; all unknown when the profile is unavailable
    fn community_files(&mut self) {
        let repo_license = self.snapshot.repository.license.is_some();
        let Some(profile) = &self.snapshot.community else {
            self.set(MetricId::HasContributing, RawMetricValue::Unknown);
            self.set(MetricId::HasCodeOfConduct, RawMetricValue::Unknown);
            self.set(MetricId::HasLicense, RawMetricValue::Boolean(repo_license));
            self.set(MetricId::CommunityHealth, RawMetricValue::Unknown);
            self.set(MetricId::HasIssueTemplates, RawMetricValue::Unknown);
            return;
        };

        let files = &profile.files;
        self.set(
            MetricId::HasContributing,
            RawMetricValue::Boolean(files.has_contributing()),
        );
        self.set(
            MetricId::HasCodeOfConduct,
            RawMetricValue::Boolean(files.has_code_of_conduct()),
        );
        self.set(
            MetricId::HasLicense,
            RawMetricValue::Boolean(repo_license || files.has_license()),
        );
        self.set(
            MetricId::CommunityHealth,
            RawMetricValue::number(f64::from(profile.health_percentage.min(100))),
        );
        self.set(
            MetricId::HasIssueTemplates,
            RawMetricValue::Boolean(files.has_issue_template()),
        );
    }

    fn governance(&mut self) {
        let governance = &self.snapshot.governance;
        self.set(
            MetricId::HasGovernance,
            RawMetricValue::Boolean(governance.has_governance()),
        );
        self.set(
            MetricId::HasCodeowners,
            RawMetricValue::Boolean(governance.has_codeowners()),
        );
    }

    fn best_practices_badge(&mut self) {
        let value = match &self.snapshot.badge {
            Some(level) => RawMetricValue::categorical(level.as_str()),
            None => RawMetricValue::Unknown,
        };
        self.set(MetricId::BestPracticesBadge, value);
    }

    fn foundation_affiliation(&mut self) {
        let value = match self.snapshot.foundation {
            Some(tier) => RawMetricValue::categorical(tier.as_str()),
            None => RawMetricValue::Unknown,
        };
        self.set(MetricId::FoundationAffiliation, value);
    }
}

/// Smallest number of top contributors covering half of all contributions
pub(crate) fn bus_factor(contributions: &[u64]) -> usize {
    let total: u64 = contributions.iter().sum();
    if total == 0 {
        return 0;
    }

    let mut sorted = contributions.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let mut covered = 0u64;
    let mut count = 0;
    for c in sorted {
        covered += c;
        count += 1;
        // covered / total >= 0.5
        if covered * 2 >= total {
            break;
        }
    }
    count.max(1)
}

fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds() as f64 / 86_400.0
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_or_unknown(values: &[f64]) -> RawMetricValue {
    if values.is_empty() {
        RawMetricValue::Unknown
    } else {
        RawMetricValue::number(mean(values))
    }
}
