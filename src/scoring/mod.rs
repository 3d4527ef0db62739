//! Repository health scoring
//!
//! # Scoring Formula
//!
//! ```text
//! metric score   = rule(raw value)            in [0, 100], unknown = 50
//! category score = mean(metric scores)        empty category = 0
//! overall        = Σ(category × weight) / Σ(weight)   over non-empty categories
//! ```
//!
//! Numeric rules interpolate linearly between thresholds and clamp outside
//! them. Boolean rules give fixed pass/fail scores, categorical rules look
//! the tag up.
//!
//! # Default weights
//!
//! - Activity: 0.25
//! - Community: 0.20
//! - Maintenance: 0.20
//! - Documentation: 0.15
//! - Governance: 0.20

mod aggregate;
mod scorer;
pub mod thresholds;

pub use aggregate::{AggregationEngine, CategoryWeights};
pub use scorer::{ScoringEngine, UNKNOWN_SCORE};
pub use thresholds::{default_rule, default_rules, Direction, ThresholdConfig, ThresholdError};
