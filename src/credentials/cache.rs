//! Credential caching with refresh ahead of expiry.

use super::{AwsCredentials, CredentialProvider};
use crate::credentials::error::CredentialError;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Default cache TTL for credentials without an expiration (15 minutes).
const DEFAULT_CACHE_TTL_SECS: i64 = 900;

/// Default refresh buffer (5 minutes before expiration).
const DEFAULT_REFRESH_BUFFER_SECS: i64 = 300;

#[derive(Clone)]
struct CachedEntry {
    credentials: AwsCredentials,
    cache_expiration: DateTime<Utc>,
}

impl CachedEntry {
    fn needs_refresh(&self, buffer: ChronoDuration) -> bool {
        Utc::now() >= self.cache_expiration || self.credentials.expires_within(buffer)
    }
}

/// Caches the credentials of an inner provider.
///
/// Temporary credentials are refreshed once they come within the refresh
/// buffer of their expiration; long-lived ones are re-fetched after the
/// cache TTL. Clones share one cache.
///
/// Concurrent callers that find the cache stale may each call the inner
/// provider; the refresh is serialized on the write lock and later callers
/// reuse the entry the first one stored.
pub struct CachedCredentialProvider<P> {
    inner: P,
    cache: Arc<RwLock<Option<CachedEntry>>>,
    cache_ttl: ChronoDuration,
    refresh_buffer: ChronoDuration,
}

impl<P: CredentialProvider> CachedCredentialProvider<P> {
    /// Wrap `provider` with the default TTL and refresh buffer.
    pub fn new(provider: P) -> Self {
        Self {
            inner: provider,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl: ChronoDuration::seconds(DEFAULT_CACHE_TTL_SECS),
            refresh_buffer: ChronoDuration::seconds(DEFAULT_REFRESH_BUFFER_SECS),
        }
    }

    /// Set how long credentials without an expiration are cached.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ChronoDuration::from_std(ttl)
            .unwrap_or_else(|_| ChronoDuration::seconds(DEFAULT_CACHE_TTL_SECS));
        self
    }

    /// Set how long before expiration temporary credentials are refreshed.
    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = ChronoDuration::from_std(buffer)
            .unwrap_or_else(|_| ChronoDuration::seconds(DEFAULT_REFRESH_BUFFER_SECS));
        self
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drop the cached entry; the next call fetches fresh credentials.
    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
    }

    /// `true` if a cached entry is present and still usable.
    pub async fn has_cached_credentials(&self) -> bool {
        self.cache
            .read()
            .await
            .as_ref()
            .map_or(false, |entry| !entry.needs_refresh(self.refresh_buffer))
    }

    async fn fetch_and_cache(&self) -> Result<AwsCredentials, CredentialError> {
        let mut cache = self.cache.write().await;

        if let Some(entry) = cache.as_ref() {
            if !entry.needs_refresh(self.refresh_buffer) {
                return Ok(entry.credentials.clone());
            }
        }

        let credentials = self.inner.credentials().await?;

        let ttl_expiration = Utc::now() + self.cache_ttl;
        let cache_expiration = match credentials.expiration() {
            Some(expiration) => std::cmp::min(*expiration, ttl_expiration),
            None => ttl_expiration,
        };

        debug!(
            provider = self.inner.name(),
            cache_expiration = %cache_expiration,
            "Cached credentials"
        );

        *cache = Some(CachedEntry {
            credentials: credentials.clone(),
            cache_expiration,
        });

        Ok(credentials)
    }
}

impl<P: Clone> Clone for CachedCredentialProvider<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            cache: Arc::clone(&self.cache),
            cache_ttl: self.cache_ttl,
            refresh_buffer: self.refresh_buffer,
        }
    }
}

#[async_trait]
impl<P: CredentialProvider> CredentialProvider for CachedCredentialProvider<P> {
    async fn credentials(&self) -> Result<AwsCredentials, CredentialError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref() {
                if !entry.needs_refresh(self.refresh_buffer) {
                    return Ok(entry.credentials.clone());
                }
            }
        }

        self.fetch_and_cache().await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

impl<P: fmt::Debug> fmt::Debug for CachedCredentialProvider<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedCredentialProvider")
            .field("inner", &self.inner)
            .field("cache_ttl", &self.cache_ttl)
            .field("refresh_buffer", &self.refresh_buffer)
            .finish()
    }
}
