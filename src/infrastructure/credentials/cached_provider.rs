use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use crate::domain::{ApiKeyProvider, DomainError};

/// API key provider wrapper that caches keys with a TTL
#[derive(Debug)]
pub struct CachedApiKeyProvider<P: ApiKeyProvider> {
    inner: P,
    cache: Cache<String, String>,
}

impl<P: ApiKeyProvider> CachedApiKeyProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(100)
            .build();

        Self { inner, cache }
    }

    /// Drops a cached key so the next call reads the source again
    pub async fn invalidate(&self, service: &str) {
        self.cache.invalidate(service).await;
    }
}

#[async_trait]
impl<P: ApiKeyProvider> ApiKeyProvider for CachedApiKeyProvider<P> {
    async fn get_api_key(&self, service: &str) -> Result<Option<String>, DomainError> {
        if let Some(key) = self.cache.get(service).await {
            tracing::debug!(provider = self.inner.provider_name(), service, "Cache hit for API key");
            return Ok(Some(key));
        }

        // Absent keys are not cached so a newly configured key is seen at once
        let key = self.inner.get_api_key(service).await?;
        if let Some(key) = &key {
            self.cache.insert(service.to_string(), key.clone()).await;
        }

        Ok(key)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::credentials::mock::MockApiKeyProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct CountingProvider {
        inner: MockApiKeyProvider,
        call_count: AtomicUsize,
    }

    impl CountingProvider {
        fn new(inner: MockApiKeyProvider) -> Self {
            Self {
                inner,
                call_count: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ApiKeyProvider for CountingProvider {
        async fn get_api_key(&self, service: &str) -> Result<Option<String>, DomainError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.inner.get_api_key(service).await
        }

        fn provider_name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_key_is_cached() {
        let inner = CountingProvider::new(MockApiKeyProvider::new().with_key("GOOGLE_MAPS", "k1"));
        let cached = CachedApiKeyProvider::new(inner, Duration::from_secs(60));

        assert_eq!(cached.get_api_key("GOOGLE_MAPS").await.unwrap(), Some("k1".to_string()));
        assert_eq!(cached.get_api_key("GOOGLE_MAPS").await.unwrap(), Some("k1".to_string()));

        assert_eq!(cached.inner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_not_cached() {
        let inner = CountingProvider::new(MockApiKeyProvider::new());
        let cached = CachedApiKeyProvider::new(inner, Duration::from_secs(60));

        assert!(cached.get_api_key("GOOGLE_MAPS").await.unwrap().is_none());
        assert!(cached.get_api_key("GOOGLE_MAPS").await.unwrap().is_none());

        assert_eq!(cached.inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_refetches() {
        let inner = CountingProvider::new(MockApiKeyProvider::new().with_key("GOOGLE_MAPS", "k1"));
        let cached = CachedApiKeyProvider::new(inner, Duration::from_secs(60));

        cached.get_api_key("GOOGLE_MAPS").await.unwrap();
        cached.invalidate("GOOGLE_MAPS").await;
        cached.get_api_key("GOOGLE_MAPS").await.unwrap();

        assert_eq!(cached.inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_inner_error_propagates() {
        let cached = CachedApiKeyProvider::new(
            MockApiKeyProvider::new().with_error("vault sealed"),
            Duration::from_secs(60),
        );

        assert!(cached.get_api_key("GOOGLE_MAPS").await.is_err());
    }
}
