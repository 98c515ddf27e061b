use moka::future::Cache;
use petit_core::{Alias, StorageError};
use std::future::Future;
use std::time::Duration;
use tracing::trace;

/// Read-through cache of alias → target lookups, backed by Moka.
///
/// Only positive lookups are cached, and every entry expires a fixed time
/// after insertion. An alias that does not resolve is never remembered, so
/// a record written by another process becomes visible on the next read.
#[derive(Debug, Clone)]
pub struct MokaTargetCache {
    cache: Cache<String, String>,
}

impl MokaTargetCache {
    /// Creates a cache holding at most `max_capacity` entries, each expiring
    /// `ttl` after insertion.
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Cached target for `alias`, if any.
    pub async fn get(&self, alias: &Alias) -> Option<String> {
        let target = self.cache.get(alias.as_str()).await;
        trace!(alias = %alias, hit = target.is_some(), "Moka lookup");
        target
    }

    /// Get the target from the cache, computing it with `fetch` on a miss.
    ///
    /// Concurrent misses for the same alias share one `fetch`. Errors from
    /// `fetch`, including [`StorageError::NotFound`], are returned as-is and
    /// nothing is cached.
    pub async fn get_or_compute<F, Fut>(
        &self,
        alias: &Alias,
        fetch: F,
    ) -> Result<String, StorageError>
    where
        F: FnOnce(&Alias) -> Fut,
        Fut: Future<Output = Result<String, StorageError>>,
    {
        self.cache
            .try_get_with(alias.as_str().to_owned(), async {
                trace!(alias = %alias, "Cache miss, performing single-flight fetch");
                fetch(alias).await
            })
            .await
            .map_err(|e| e.as_ref().clone())
    }
}
