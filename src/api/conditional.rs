//! ETag-based conditional re-fetch
//!
//! One instance lives for the whole process and is shared by reference
//! between evaluations. Entries are keyed by endpoint plus sorted query
//! parameters, so two repositories never collide.

use super::{ApiError, ApiResult, Fetched};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::future::Future;
use tracing::debug;

/// Last successful response for a key
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub etag: Option<String>,
    pub payload: String,
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of one (possibly conditional) request
#[derive(Debug, Clone, PartialEq)]
pub enum Conditional {
    /// 2xx with a fresh body
    Modified {
        etag: Option<String>,
        payload: String,
    },
    /// 304: the stored payload is still current
    NotModified,
    /// 404 on an optional resource
    Absent,
}

/// Process-lifetime ETag and payload store
#[derive(Debug, Default)]
pub struct ConditionalRequestCache {
    entries: DashMap<String, CacheEntry>,
}

impl ConditionalRequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized key: endpoint followed by parameters sorted by name
    pub fn cache_key(endpoint_key: &str, params: &[(&str, String)]) -> String {
        if params.is_empty() {
            return endpoint_key.to_string();
        }
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort();
        let query: Vec<String> = sorted.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{endpoint_key}?{}", query.join("&"))
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    fn etag_for(&self, key: &str) -> Option<String> {
        self.entries.get(key).and_then(|e| e.etag.clone())
    }

    fn payload_for(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|e| e.payload.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn store(&self, key: &str, etag: Option<String>, payload: &str) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                etag,
                payload: payload.to_string(),
                fetched_at: Utc::now(),
            },
        );
    }

    /// Fetch through the cache.
    ///
    /// `perform` receives the ETag to send as `If-None-Match` (None on the
    /// first request for a key) and reports what the server answered.
    /// Returns `data = None` only when the resource is absent.
    pub async fn fetch_conditional<F, Fut>(
        &self,
        endpoint_key: &str,
        params: &[(&str, String)],
        mut perform: F,
    ) -> ApiResult<Fetched<Option<String>>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = ApiResult<Conditional>>,
    {
        let key = Self::cache_key(endpoint_key, params);
        let etag = self.etag_for(&key);

        match perform(etag).await? {
            Conditional::Modified { etag, payload } => {
                self.store(&key, etag, &payload);
                Ok(Fetched::new(Some(payload), false))
            }
            Conditional::Absent => Ok(Fetched::new(None, false)),
            Conditional::NotModified => {
                if let Some(payload) = self.payload_for(&key) {
                    debug!("{}: not modified, using cached payload", key);
                    return Ok(Fetched::new(Some(payload), true));
                }

                // Entry vanished between sending and receiving; ask again unconditionally
                debug!("{}: 304 without a cached payload, refetching", key);
                match perform(None).await? {
                    Conditional::Modified { etag, payload } => {
                        self.store(&key, etag, &payload);
                        Ok(Fetched::new(Some(payload), false))
                    }
                    Conditional::Absent => Ok(Fetched::new(None, false)),
                    Conditional::NotModified => Err(ApiError::Unexpected {
                        status: 304,
                        message: format!("{key}: not modified without a cached payload"),
                    }),
                }
            }
        }
    }
}
