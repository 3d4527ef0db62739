//! repohealth - repository health evaluation
//!
//! ```text
//! DataClient -> RepoSnapshot -> MetricComputationEngine -> ScoringEngine -> AggregationEngine
//! ```
//!
//! [`pipeline::Evaluator`] wires the stages together.

pub mod api;
pub mod config;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod reporters;
pub mod scoring;
