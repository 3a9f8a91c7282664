//! Cache-aside composition for the asset search path.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::Cache;
use crate::providers::yahoo::{MarketDataError, SearchResult, YahooClient};

/// Seam between the cache-aside layer and the upstream search integration.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize)
    -> Result<Vec<SearchResult>, MarketDataError>;
}

#[async_trait]
impl SearchProvider for YahooClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, MarketDataError> {
        YahooClient::search(self, query, limit).await
    }
}

/// Observability metadata accompanying a lookup. Not part of the cached
/// payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheDiagnostics {
    pub hit: bool,
    pub ttl: Option<Duration>,
    pub key: String,
}

/// Cache-aside search over a shared JSON cache and the market data client.
///
/// The cache stores the untruncated provider result; truncation to `limit`
/// happens at read time. A warm entry shorter than a later, larger `limit`
/// is served as-is rather than re-queried.
pub struct AssetSearch {
    provider: Arc<dyn SearchProvider>,
    cache: Arc<dyn Cache>,
    default_ttl: Duration,
}

impl AssetSearch {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        cache: Arc<dyn Cache>,
        default_ttl: Duration,
    ) -> Self {
        Self {
            provider,
            cache,
            default_ttl,
        }
    }

    pub async fn lookup(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<(Vec<SearchResult>, CacheDiagnostics), MarketDataError> {
        let trimmed = query.trim();
        let key = format!("assets:search:{}", trimmed.to_lowercase());

        if trimmed.is_empty() {
            return Ok((
                Vec::new(),
                CacheDiagnostics {
                    hit: false,
                    ttl: None,
                    key,
                },
            ));
        }

        if let Some(value) = self.cache.get_json(&key).await {
            match serde_json::from_value::<Vec<SearchResult>>(value) {
                // An empty cached sequence is treated as a miss and
                // re-queried.
                Ok(results) if !results.is_empty() => {
                    let ttl = self.cache.ttl_remaining(&key).await;
                    let mut results = results;
                    results.truncate(limit);
                    return Ok((
                        results,
                        CacheDiagnostics {
                            hit: true,
                            ttl,
                            key,
                        },
                    ));
                }
                Ok(_) => debug!("Empty cached search for {key}, re-querying"),
                Err(e) => debug!("Discarding undecodable cached search for {key}: {e}"),
            }
        }

        let mut results = self.provider.search(trimmed, limit).await?;
        if let Ok(payload) = serde_json::to_value(&results) {
            self.cache.set_json(&key, &payload, self.default_ttl).await;
        }
        let ttl = self.cache.ttl_remaining(&key).await;
        results.truncate(limit);
        Ok((
            results,
            CacheDiagnostics {
                hit: false,
                ttl,
                key,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        results: Vec<SearchResult>,
    }

    impl CountingProvider {
        fn with(results: Vec<SearchResult>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                results,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchProvider for CountingProvider {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<SearchResult>, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.results.clone())
        }
    }

    fn result(symbol: &str) -> SearchResult {
        SearchResult {
            symbol: symbol.to_string(),
            shortname: None,
            longname: None,
            exch: None,
            exch_disp: None,
            type_disp: None,
        }
    }

    fn search_over(provider: Arc<CountingProvider>) -> (AssetSearch, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let search = AssetSearch::new(provider, cache.clone(), Duration::from_secs(3600));
        (search, cache)
    }

    #[tokio::test]
    async fn cold_lookup_calls_upstream_once_and_populates_the_cache() {
        let provider = CountingProvider::with(vec![result("VALE3.SA")]);
        let (search, cache) = search_over(provider.clone());

        let (results, diag) = search.lookup("vale", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(provider.calls(), 1);
        assert!(!diag.hit);
        assert_eq!(diag.key, "assets:search:vale");
        let ttl = diag.ttl.unwrap();
        assert!(ttl > Duration::ZERO && ttl <= Duration::from_secs(3600));
        assert!(cache.get_json("assets:search:vale").await.is_some());
    }

    #[tokio::test]
    async fn warm_lookup_is_served_from_cache() {
        let provider = CountingProvider::with(vec![result("VALE3.SA")]);
        let (search, _cache) = search_over(provider.clone());

        search.lookup("vale", 5).await.unwrap();
        let (results, diag) = search.lookup("VALE", 5).await.unwrap();

        // Key normalization makes the second query hit the first entry.
        assert_eq!(results[0].symbol, "VALE3.SA");
        assert_eq!(provider.calls(), 1);
        assert!(diag.hit);
        assert!(diag.ttl.unwrap() <= Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn blank_query_touches_neither_cache_nor_upstream() {
        let provider = CountingProvider::with(vec![result("VALE3.SA")]);
        let (search, cache) = search_over(provider.clone());

        let (results, diag) = search.lookup("   ", 5).await.unwrap();
        assert!(results.is_empty());
        assert!(!diag.hit);
        assert_eq!(provider.calls(), 0);
        assert!(cache.get_json("assets:search:").await.is_none());
    }

    #[tokio::test]
    async fn truncation_happens_at_read_time_only() {
        let provider =
            CountingProvider::with(vec![result("A"), result("B"), result("C"), result("D")]);
        let (search, _cache) = search_over(provider.clone());

        let (first, _) = search.lookup("letters", 2).await.unwrap();
        assert_eq!(first.len(), 2);

        // The untruncated sequence was cached, so a larger limit can be
        // satisfied without another upstream call.
        let (second, diag) = search.lookup("letters", 4).await.unwrap();
        assert_eq!(second.len(), 4);
        assert!(diag.hit);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn lookup_serves_short_warm_entry_without_refetch() {
        // Known boundary case: a warm entry shorter than the requested
        // limit is served as-is instead of re-querying upstream.
        let provider = CountingProvider::with(vec![result("A"), result("B")]);
        let (search, _cache) = search_over(provider.clone());

        search.lookup("letters", 2).await.unwrap();
        let (results, diag) = search.lookup("letters", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(diag.hit);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn corrupt_cache_entry_falls_back_to_upstream() {
        let provider = CountingProvider::with(vec![result("VALE3.SA")]);
        let (search, cache) = search_over(provider.clone());

        cache
            .set_json(
                "assets:search:vale",
                &json!({"not": "a result list"}),
                Duration::from_secs(3600),
            )
            .await;

        let (results, diag) = search.lookup("vale", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(!diag.hit);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn empty_cached_sequence_is_requeried() {
        let provider = CountingProvider::with(vec![result("VALE3.SA")]);
        let (search, cache) = search_over(provider.clone());

        cache
            .set_json("assets:search:vale", &json!([]), Duration::from_secs(3600))
            .await;

        let (results, diag) = search.lookup("vale", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(!diag.hit);
        assert_eq!(provider.calls(), 1);
    }
}
