//! Evaluation pipeline
//!
//! Runs one repository evaluation end to end:
//! 1. Fetch every resource concurrently (first error aborts)
//! 2. Compute raw metrics from the snapshot
//! 3. Score each metric against its threshold rule
//! 4. Aggregate into category scores, an overall grade and a summary

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

use crate::api::foundation;
use crate::api::{ApiResult, DataClient, ItemState, RepoId, Sleeper, TokioSleeper, Transport};
use crate::metrics::{MetricComputationEngine, RepoSnapshot};
use crate::models::{HealthScore, Metric};
use crate::scoring::{AggregationEngine, ScoringEngine};

/// Whether a resource was served from the conditional cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceFetch {
    pub resource: &'static str,
    pub from_cache: bool,
}

/// Result of one evaluation
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub repository: String,
    pub evaluated_at: DateTime<Utc>,
    pub health: HealthScore,
    /// Every scored metric in catalog order, also grouped under `health`
    pub metrics: Vec<Metric>,
    pub fetches: Vec<ResourceFetch>,
}

impl Evaluation {
    pub fn new(
        repository: String,
        evaluated_at: DateTime<Utc>,
        health: HealthScore,
        fetches: Vec<ResourceFetch>,
    ) -> Self {
        let metrics = health
            .categories
            .values()
            .flat_map(|c| c.metrics.iter().cloned())
            .collect();
        Self {
            repository,
            evaluated_at,
            health,
            metrics,
            fetches,
        }
    }

    pub fn cached_count(&self) -> usize {
        self.fetches.iter().filter(|f| f.from_cache).count()
    }

    /// All scored metrics, in catalog order
    pub fn metrics(&self) -> impl Iterator<Item = &Metric> {
        self.metrics.iter()
    }
}

/// Full evaluation pipeline.
pub struct Evaluator<T, S = TokioSleeper> {
    client: DataClient<T, S>,
    metrics: MetricComputationEngine,
    scoring: ScoringEngine,
    aggregation: AggregationEngine,
}

impl<T: Transport, S: Sleeper> Evaluator<T, S> {
    /// Create an evaluator with the built-in rules and weights.
    pub fn new(client: DataClient<T, S>) -> Self {
        Self {
            client,
            metrics: MetricComputationEngine::default(),
            scoring: ScoringEngine::default(),
            aggregation: AggregationEngine::default(),
        }
    }

    /// Use custom threshold rules.
    pub fn with_scoring(mut self, scoring: ScoringEngine) -> Self {
        self.scoring = scoring;
        self
    }

    /// Use custom category weights.
    pub fn with_aggregation(mut self, aggregation: AggregationEngine) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn client(&self) -> &DataClient<T, S> {
        &self.client
    }

    pub async fn evaluate(&self, repo: &RepoId) -> ApiResult<Evaluation> {
        self.evaluate_at(repo, Utc::now()).await
    }

    /// Evaluate against a fixed clock
    pub async fn evaluate_at(&self, repo: &RepoId, now: DateTime<Utc>) -> ApiResult<Evaluation> {
        info!("Evaluating {}", repo);
        let start = Instant::now();

        let (snapshot, fetches) = self.fetch_snapshot(repo, now).await?;
        debug!(
            "Fetched {} resources in {:?} ({} from cache)",
            fetches.len(),
            start.elapsed(),
            fetches.iter().filter(|f| f.from_cache).count()
        );

        let health = self.score_snapshot(&snapshot, now);
        info!(
            "{}: {:.1} ({}) in {:?}",
            repo,
            health.overall_score,
            health.overall_grade,
            start.elapsed()
        );

        Ok(Evaluation::new(repo.full_name(), now, health, fetches))
    }

    /// Fetch every resource the metrics need
    pub async fn fetch_snapshot(
        &self,
        repo: &RepoId,
        now: DateTime<Utc>,
    ) -> ApiResult<(RepoSnapshot, Vec<ResourceFetch>)> {
        let client = &self.client;
        let (
            repository,
            commits,
            contributors,
            issues,
            open_issues,
            pull_requests,
            releases,
            community,
            readme,
            governance,
            badge,
        ) = tokio::try_join!(
            client.get_repository(repo),
            client.get_commits(repo, self.metrics.since(now)),
            client.get_contributors(repo),
            client.get_issues(repo, ItemState::All),
            client.get_issues(repo, ItemState::Open),
            client.get_pull_requests(repo, ItemState::All),
            client.get_releases(repo),
            client.get_community_profile(repo),
            client.get_readme(repo),
            client.get_governance_files(repo),
            client.get_external_badge(repo),
        )?;

        let fetches = vec![
            fetch("repository", repository.from_cache),
            fetch("commits", commits.from_cache),
            fetch("contributors", contributors.from_cache),
            fetch("issues", issues.from_cache),
            fetch("open_issues", open_issues.from_cache),
            fetch("pull_requests", pull_requests.from_cache),
            fetch("releases", releases.from_cache),
            fetch("community_profile", community.from_cache),
            fetch("readme", readme.from_cache),
            fetch("governance_files", governance.from_cache),
            fetch("badge", badge.from_cache),
        ];

        // Same inputs detect_foundation_affiliation would fetch again
        let foundation = foundation::detect(&repository.data, readme.data.as_deref());

        let snapshot = RepoSnapshot {
            repository: repository.data,
            commits: commits.data,
            contributors: contributors.data,
            issues: issues.data,
            open_issues: open_issues.data,
            pull_requests: pull_requests.data,
            releases: releases.data,
            community: community.data,
            readme: readme.data,
            governance: governance.data,
            badge: badge.data,
            foundation,
        };
        Ok((snapshot, fetches))
    }

    /// Compute, score and aggregate an already fetched snapshot
    pub fn score_snapshot(&self, snapshot: &RepoSnapshot, now: DateTime<Utc>) -> HealthScore {
        let raw = self.metrics.compute(snapshot, now);
        let metrics = self.scoring.score_all(raw);
        self.aggregation.aggregate(metrics)
    }
}

fn fetch(resource: &'static str, from_cache: bool) -> ResourceFetch {
    ResourceFetch {
        resource,
        from_cache,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Contributor, Repository};
    use crate::api::{ClientOptions, RetryPolicy};
    use crate::models::{CategoryId, Grade};
    use std::time::Duration;

    fn evaluator() -> Evaluator<crate::api::UreqTransport> {
        let client = DataClient::with_ureq(
            ClientOptions::default(),
            RetryPolicy::default(),
            Duration::from_secs(1),
        );
        Evaluator::new(client)
    }

    #[test]
    fn test_empty_snapshot_scores_every_category() {
        let health = evaluator().score_snapshot(&RepoSnapshot::default(), Utc::now());
        assert_eq!(health.categories.len(), 5);
        for category in CategoryId::ALL {
            assert!(!health.categories[&category].is_empty());
        }
        assert!((0.0..=100.0).contains(&health.overall_score));
    }

    #[test]
    fn test_popular_repository_scores_well_on_community() {
        let snapshot = RepoSnapshot {
            repository: Repository {
                stargazers_count: 50_000,
                forks_count: 5_000,
                ..Default::default()
            },
            contributors: (0..60)
                .map(|i| Contributor {
                    login: Some(format!("dev{i}")),
                    contributions: 10,
                })
                .collect(),
            ..Default::default()
        };
        let health = evaluator().score_snapshot(&snapshot, Utc::now());
        let community = &health.categories[&CategoryId::Community];
        // stars, forks, contributors and bus factor max out; no new contributors
        assert_eq!(community.score, (100.0 * 4.0 + 20.0) / 5.0);
        assert_eq!(community.grade, Grade::B);
    }
}
