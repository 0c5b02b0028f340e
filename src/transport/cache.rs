//! Response caching and in-flight request coalescing.

use super::{ConsumerId, TopologyTransport};
use crate::core::config::CacheConfig;
use crate::core::{Result, TopographError};
use crate::topology::{Cacheability, RequestKey, RequestOptions, TopologyRequest, TopologyResponse};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

type SharedQuery =
    Shared<BoxFuture<'static, std::result::Result<Arc<TopologyResponse>, Arc<TopographError>>>>;

/// Dedup bucket: isolated requests are keyed by their consumer as well.
/// The full request is part of the key, so two requests only share a bucket
/// when they are value-equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    consumer: Option<ConsumerId>,
    request: TopologyRequest,
}

impl BucketKey {
    fn new(consumer: ConsumerId, request: &TopologyRequest, options: RequestOptions) -> Self {
        Self {
            consumer: options.isolated.then_some(consumer),
            request: request.clone(),
        }
    }

    fn log_key(&self) -> RequestKey {
        self.request.cache_key()
    }
}

struct CachedResponse {
    response: Arc<TopologyResponse>,
    stored_at: Instant,
}

/// Wraps a transport with an LRU response cache and coalescing of
/// identical concurrent requests.
///
/// Identical requests share one in-flight query only inside the same dedup
/// bucket. Isolated requests get a bucket per consumer, so two widgets
/// asking for the same topology never share a fetch or a cache entry.
pub struct CachingTransport<T> {
    inner: Arc<T>,
    cache: Mutex<LruCache<BucketKey, CachedResponse>>,
    in_flight: Mutex<HashMap<BucketKey, SharedQuery>>,
    ttl: Duration,
    timeout: Option<Duration>,
}

impl<T: TopologyTransport + 'static> CachingTransport<T> {
    /// Wrap `inner` using the cache settings from configuration
    pub fn new(inner: T, config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(inner),
            cache: Mutex::new(LruCache::new(capacity)),
            in_flight: Mutex::new(HashMap::new()),
            ttl: config.ttl,
            timeout: None,
        }
    }

    /// Fail queries that take longer than `timeout` with
    /// [`TopographError::Timeout`]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Number of live cache entries
    pub fn cached_entries(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drop every cached response
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    fn cached(&self, key: &BucketKey) -> Option<Arc<TopologyResponse>> {
        let mut cache = self.cache.lock();
        let fresh = cache
            .get(key)
            .map(|entry| (entry.stored_at.elapsed() < self.ttl, Arc::clone(&entry.response)));
        match fresh {
            Some((true, response)) => Some(response),
            Some((false, _)) => {
                cache.pop(key);
                None
            },
            None => None,
        }
    }

    fn join_or_start(
        &self,
        key: BucketKey,
        consumer: ConsumerId,
        request: &TopologyRequest,
        options: RequestOptions,
    ) -> SharedQuery {
        let mut in_flight = self.in_flight.lock();
        if let Some(existing) = in_flight.get(&key) {
            tracing::debug!(key = %key.log_key(), %consumer, "joining in-flight topology request");
            return existing.clone();
        }

        let inner = Arc::clone(&self.inner);
        let request = request.clone();
        let timeout = self.timeout;
        let query = async move {
            let pending = inner.query(consumer, &request, options);
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, pending).await.unwrap_or_else(|_| {
                    tracing::warn!(key = %request.cache_key(), ?limit, "topology request timed out");
                    Err(TopographError::Timeout {
                        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })
                }),
                None => pending.await,
            };
            result.map(Arc::new).map_err(Arc::new)
        }
        .boxed()
        .shared();
        in_flight.insert(key, query.clone());
        query
    }

    /// Forget `query` once it finished. A newer query started for the same
    /// bucket in the meantime stays in place.
    fn release(&self, key: &BucketKey, query: &SharedQuery) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(key).is_some_and(|current| current.ptr_eq(query)) {
            in_flight.remove(key);
        }
    }
}

#[async_trait]
impl<T: TopologyTransport + 'static> TopologyTransport for CachingTransport<T> {
    async fn query(
        &self,
        consumer: ConsumerId,
        request: &TopologyRequest,
        options: RequestOptions,
    ) -> Result<TopologyResponse> {
        let key = BucketKey::new(consumer, request, options);
        let cacheable = options.cacheability == Cacheability::Cacheable;

        if cacheable {
            if let Some(response) = self.cached(&key) {
                tracing::debug!(key = %key.log_key(), %consumer, "topology cache hit");
                return Ok(response.as_ref().clone());
            }
        }

        let query = self.join_or_start(key.clone(), consumer, request, options);
        let result = query.clone().await;
        self.release(&key, &query);

        let response = result.map_err(TopographError::from_shared)?;
        if cacheable {
            self.cache.lock().put(
                key,
                CachedResponse {
                    response: Arc::clone(&response),
                    stored_at: Instant::now(),
                },
            );
        }
        Ok(response.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityType, TimeRange};
    use crate::topology::{TopologyDataSource, TopologyWidgetConfig};
    use crate::transport::StaticTransport;
    use chrono::{TimeZone, Utc};

    fn request() -> TopologyRequest {
        request_ending_at(60_000)
    }

    fn request_ending_at(end_ms: i64) -> TopologyRequest {
        let time_range = TimeRange::new(
            Utc.timestamp_millis_opt(1_000).unwrap(),
            Utc.timestamp_millis_opt(end_ms).unwrap(),
        )
        .unwrap();
        TopologyDataSource::new(TopologyWidgetConfig::new(EntityType::Service))
            .unwrap()
            .with_time_range(time_range)
            .build_request()
            .unwrap()
    }

    fn shared_options() -> RequestOptions {
        RequestOptions {
            cacheability: Cacheability::Cacheable,
            isolated: false,
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_transport() {
        let transport = CachingTransport::new(
            StaticTransport::new(TopologyResponse::default()),
            &CacheConfig::default(),
        );
        let request = request();

        transport.query(ConsumerId(1), &request, shared_options()).await.unwrap();
        transport.query(ConsumerId(1), &request, shared_options()).await.unwrap();

        assert_eq!(transport.inner().calls(), 1);
        assert_eq!(transport.cached_entries(), 1);
    }

    #[tokio::test]
    async fn test_no_store_always_fetches() {
        let transport = CachingTransport::new(
            StaticTransport::new(TopologyResponse::default()),
            &CacheConfig::default(),
        );
        let request = request();
        let options = RequestOptions {
            cacheability: Cacheability::NoStore,
            isolated: false,
        };

        transport.query(ConsumerId(1), &request, options).await.unwrap();
        transport.query(ConsumerId(1), &request, options).await.unwrap();

        assert_eq!(transport.inner().calls(), 2);
        assert_eq!(transport.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_are_coalesced() {
        let transport = CachingTransport::new(
            StaticTransport::new(TopologyResponse::default()).with_latency(Duration::from_millis(20)),
            &CacheConfig::default(),
        );
        let request = request();

        let (a, b) = tokio::join!(
            transport.query(ConsumerId(1), &request, shared_options()),
            transport.query(ConsumerId(2), &request, shared_options()),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(transport.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_isolated_requests_are_not_shared_across_consumers() {
        let transport = CachingTransport::new(
            StaticTransport::new(TopologyResponse::default()).with_latency(Duration::from_millis(20)),
            &CacheConfig::default(),
        );
        let request = request();
        let isolated = RequestOptions {
            cacheability: Cacheability::Cacheable,
            isolated: true,
        };

        let (a, b) = tokio::join!(
            transport.query(ConsumerId(1), &request, isolated),
            transport.query(ConsumerId(2), &request, isolated),
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(transport.inner().calls(), 2);

        transport.query(ConsumerId(1), &request, isolated).await.unwrap();
        assert_eq!(transport.inner().calls(), 2, "same consumer hits its own cache entry");
    }

    #[tokio::test]
    async fn test_errors_are_propagated_and_not_cached() {
        let transport = CachingTransport::new(
            StaticTransport::from_sequence(vec![
                Err(TopographError::transport("backend unavailable")),
                Ok(TopologyResponse::default()),
            ]),
            &CacheConfig::default(),
        );
        let request = request();

        let err = transport.query(ConsumerId(1), &request, shared_options()).await.unwrap_err();
        assert_eq!(err.category(), "transport");
        assert!(transport.query(ConsumerId(1), &request, shared_options()).await.is_ok());
        assert_eq!(transport.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let config = CacheConfig {
            max_entries: 4,
            ttl: Duration::from_millis(0),
        };
        let transport = CachingTransport::new(StaticTransport::new(TopologyResponse::default()), &config);
        let request = request();

        transport.query(ConsumerId(1), &request, shared_options()).await.unwrap();
        transport.query(ConsumerId(1), &request, shared_options()).await.unwrap();
        assert_eq!(transport.inner().calls(), 2);
    }

    #[tokio::test]
    async fn test_distinct_requests_get_distinct_entries() {
        let first = TopologyResponse::from_json(r#"{"nodes": [{"id": "a", "type": "SERVICE"}]}"#).unwrap();
        let transport = CachingTransport::new(
            StaticTransport::from_sequence(vec![Ok(first.clone()), Ok(TopologyResponse::default())]),
            &CacheConfig::default(),
        );
        let (a, b) = (request_ending_at(60_000), request_ending_at(120_000));

        assert_eq!(transport.query(ConsumerId(1), &a, shared_options()).await.unwrap(), first);
        assert!(transport.query(ConsumerId(1), &b, shared_options()).await.unwrap().nodes.is_empty());
        assert_eq!(transport.query(ConsumerId(1), &a, shared_options()).await.unwrap(), first);
        assert_eq!(transport.inner().calls(), 2);
        assert_eq!(transport.cached_entries(), 2);
    }

    #[tokio::test]
    async fn test_timeout_reaches_every_coalesced_caller() {
        let transport = CachingTransport::new(
            StaticTransport::new(TopologyResponse::default()).with_latency(Duration::from_millis(500)),
            &CacheConfig::default(),
        )
        .with_timeout(Duration::from_millis(10));
        let request = request();

        let (a, b) = tokio::join!(
            transport.query(ConsumerId(1), &request, shared_options()),
            transport.query(ConsumerId(2), &request, shared_options()),
        );
        for result in [a, b] {
            let err = result.unwrap_err();
            assert!(matches!(err, TopographError::Timeout { timeout_ms: 10 }));
            assert!(err.is_recoverable());
        }
        assert_eq!(transport.inner().calls(), 1);
        assert_eq!(transport.cached_entries(), 0);
    }

    #[tokio::test]
    async fn test_finished_query_only_releases_its_own_slot() {
        let transport = CachingTransport::new(
            StaticTransport::new(TopologyResponse::default()),
            &CacheConfig::default(),
        );
        let request = request();
        let key = BucketKey::new(ConsumerId(1), &request, shared_options());

        let first = transport.join_or_start(key.clone(), ConsumerId(1), &request, shared_options());
        transport.release(&key, &first);
        let second = transport.join_or_start(key.clone(), ConsumerId(1), &request, shared_options());

        // A late caller of the first query must leave the second one alone
        transport.release(&key, &first);
        assert!(transport.in_flight.lock().contains_key(&key));

        transport.release(&key, &second);
        assert!(transport.in_flight.lock().is_empty());
    }
}
