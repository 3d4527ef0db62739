//! In-memory time-to-live cache for endpoints that do not send ETags

use super::{ApiResult, Fetched};
use dashmap::DashMap;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: DashMap<String, (Instant, V)>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Value for `key` if it was stored less than `ttl` ago
    pub fn get(&self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.0.elapsed() < self.ttl => return Some(entry.1.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), (Instant::now(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serve a fresh entry, or run `fetch` and remember its result
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> ApiResult<Fetched<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<V>>,
    {
        if let Some(value) = self.get(key) {
            debug!("{}: served from ttl cache", key);
            return Ok(Fetched::new(value, true));
        }
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(Fetched::new(value, false))
    }
}
