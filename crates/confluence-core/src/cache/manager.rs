use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::api::ApiError;

use super::pages::Pages;

/// Hierarchical cache key, e.g. `["documents", "detail", "d1"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Extend this key with one more segment.
    pub fn child(&self, part: impl Into<String>) -> Self {
        let mut parts = self.0.clone();
        parts.push(part.into());
        Self(parts)
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

/// How long a cached result may be served without refetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    pub stale_after: Duration,
}

impl CachePolicy {
    /// Always refetch.
    pub const fn fresh() -> Self {
        Self {
            stale_after: Duration::ZERO,
        }
    }

    pub const fn stale_after(stale_after: Duration) -> Self {
        Self { stale_after }
    }
}

#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    /// A zero window is always stale.
    pub fn is_stale(&self, window: Duration) -> bool {
        if window.is_zero() {
            return true;
        }
        match chrono::Duration::from_std(window) {
            Ok(window) => Utc::now() - self.cached_at >= window,
            Err(_) => false,
        }
    }
}

#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, CachedData<Value>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<QueryKey, CachedData<Value>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Serve `key` from cache while fresh under `policy`, otherwise run
    /// `fetcher` and remember its result. Failures are never cached.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: &QueryKey,
        policy: CachePolicy,
        fetcher: F,
    ) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(hit) = self.lookup(key, policy) {
            if let Ok(value) = serde_json::from_value(hit) {
                debug!(key = %key, "Cache hit");
                return Ok(value);
            }
        }

        let fresh = fetcher().await?;
        match serde_json::to_value(&fresh) {
            Ok(value) => self.put(key.clone(), value),
            Err(e) => debug!(key = %key, error = %e, "Result not cacheable"),
        }
        Ok(fresh)
    }

    /// Load one more page of the paginated query under `key`.
    ///
    /// Loaded pages never go stale on their own; only invalidation restarts
    /// the query from `first_page`. Once `next_page` reports no further page
    /// the accumulated pages are returned without fetching. A failed fetch
    /// leaves the loaded pages as they were.
    pub async fn fetch_next_page<T, P, F, Fut, N>(
        &self,
        key: &QueryKey,
        first_page: P,
        fetcher: F,
        next_page: N,
    ) -> Result<Pages<T, P>, ApiError>
    where
        T: Serialize + DeserializeOwned,
        P: Serialize + DeserializeOwned + Clone,
        F: FnOnce(P) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
        N: FnOnce(&T, &[T]) -> Option<P>,
    {
        let mut pages = self
            .get(key)
            .and_then(|cached| serde_json::from_value::<Pages<T, P>>(cached.data).ok())
            .unwrap_or_else(|| Pages::start(first_page));

        let Some(param) = pages.next_page.clone() else {
            debug!(key = %key, pages = pages.len(), "No further pages");
            return Ok(pages);
        };

        let page = fetcher(param).await?;
        pages.next_page = next_page(&page, &pages.pages);
        pages.pages.push(page);
        debug!(key = %key, pages = pages.len(), more = pages.has_next_page(), "Page loaded");

        match serde_json::to_value(&pages) {
            Ok(value) => self.put(key.clone(), value),
            Err(e) => debug!(key = %key, error = %e, "Pages not cacheable"),
        }
        Ok(pages)
    }

    fn lookup(&self, key: &QueryKey, policy: CachePolicy) -> Option<Value> {
        let entries = self.entries();
        let cached = entries.get(key)?;
        (!cached.is_stale(policy.stale_after)).then(|| cached.data.clone())
    }

    pub fn put(&self, key: QueryKey, value: Value) {
        self.entries().insert(key, CachedData::new(value));
    }

    pub fn get(&self, key: &QueryKey) -> Option<CachedData<Value>> {
        self.entries().get(key).cloned()
    }

    /// Drop every entry under `prefix`. Returns how many were removed.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        debug!(prefix = %prefix, removed, "Cache invalidated");
        removed
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
