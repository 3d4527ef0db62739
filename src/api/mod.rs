//! Resilient data acquisition from the source-hosting API
//!
//! Every resource fetch goes through the same layers:
//!
//! ```text
//! DataClient::get_*  ->  ConditionalRequestCache (ETag / 304)
//!                    ->  RetryScheduler (backoff on 429 / 5xx / network)
//!                    ->  Transport (ureq on the blocking pool)
//! ```
//!
//! The badge lookup has no ETags and sits behind a [`TtlCache`] instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use repohealth::api::{DataClient, RepoId};
//!
//! let client = DataClient::with_ureq(config.client_options(token), config.retry.policy(), config.api.timeout());
//! let repo = client.get_repository(&RepoId::parse("rust-lang/cargo")?).await?;
//! println!("{} stars (cached: {})", repo.data.stargazers_count, repo.from_cache);
//! ```

mod client;
mod conditional;
pub mod foundation;
mod retry;
mod transport;
mod ttl;
pub mod types;

pub use client::{ClientOptions, DataClient, ItemState};
pub use conditional::{CacheEntry, Conditional, ConditionalRequestCache};
pub use retry::{
    backoff_delay, RecordingSleeper, RetryPolicy, RetryScheduler, Sleeper, TokioSleeper,
};
pub use transport::{ApiRequest, RawResponse, Transport, UreqTransport};
pub use ttl::TtlCache;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the remote API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Rate limited by the API (HTTP {status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Unauthorized (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unexpected response (HTTP {status}): {message}")]
    Unexpected { status: u16, message: String },

    #[error("Failed to decode {resource}: {message}")]
    Decode { resource: String, message: String },
}

impl ApiError {
    /// Rate limits, 5xx responses and network faults are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::RateLimited { .. } | ApiError::ServerError { .. } | ApiError::TransientNetwork(_)
        )
    }

    /// Short suggestion for the user, derived from the classification
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ApiError::RateLimited { .. } => {
                Some("Set GITHUB_TOKEN (or pass --token) to raise the API rate limit")
            }
            ApiError::NotFound { .. } => Some("Check the repository owner and name"),
            ApiError::Unauthorized { .. } => Some("Check that the API token is valid"),
            ApiError::Validation(_) => Some("Use the form owner/repo"),
            ApiError::ServerError { .. } | ApiError::TransientNetwork(_) => {
                Some("The API is unavailable right now, try again later")
            }
            ApiError::Unexpected { .. } | ApiError::Decode { .. } => None,
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(
        status: u16,
        rate_limit_remaining: Option<u32>,
        resource: &str,
        body: &str,
    ) -> Self {
        let message = truncate_message(body);
        match status {
            429 => ApiError::RateLimited { status, message },
            403 if rate_limit_remaining == Some(0) => ApiError::RateLimited { status, message },
            401 | 403 => ApiError::Unauthorized { status, message },
            404 => ApiError::NotFound {
                resource: resource.to_string(),
            },
            400 | 422 => ApiError::Validation(format!("{resource}: {message}")),
            500..=599 => ApiError::ServerError { status, message },
            _ => ApiError::Unexpected { status, message },
        }
    }
}

fn truncate_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > 200 {
        let head: String = trimmed.chars().take(200).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Result of an acquisition call plus whether it was served from the ETag cache
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub from_cache: bool,
}

impl<T> Fetched<T> {
    pub fn new(data: T, from_cache: bool) -> Self {
        Self { data, from_cache }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            data: f(self.data),
            from_cache: self.from_cache,
        }
    }
}

/// A validated `owner/name` repository identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: &str, name: &str) -> ApiResult<Self> {
        validate_segment("owner", owner)?;
        validate_segment("repository name", name)?;
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Parse `owner/name`, also accepting a `https://github.com/` prefix
    /// and a trailing `.git`
    pub fn parse(input: &str) -> ApiResult<Self> {
        let trimmed = input.trim().trim_end_matches('/');
        let path = trimmed
            .strip_prefix("https://github.com/")
            .or_else(|| trimmed.strip_prefix("http://github.com/"))
            .or_else(|| trimmed.strip_prefix("github.com/"))
            .unwrap_or(trimmed);
        let path = path.strip_suffix(".git").unwrap_or(path);

        let mut parts = path.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) => Self::new(owner, name),
            _ => Err(ApiError::Validation(format!(
                "'{input}' is not a repository identifier (expected owner/repo)"
            ))),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn validate_segment(what: &str, segment: &str) -> ApiResult<()> {
    if segment.is_empty() {
        return Err(ApiError::Validation(format!("{what} is empty")));
    }
    if segment.len() > 100 {
        return Err(ApiError::Validation(format!("{what} is too long")));
    }
    if segment == "." || segment == ".." {
        return Err(ApiError::Validation(format!("{what} '{segment}' is reserved")));
    }
    if let Some(bad) = segment
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(ApiError::Validation(format!(
            "{what} '{segment}' contains invalid character '{bad}'"
        )));
    }
    Ok(())
}
