use crate::traits::TokenIssuer;
use aliasr_core::TokenError;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Process-wide bearer-token cache shared by every call.
///
/// The (token, expiry) pair is only touched under the lock, so a reader
/// never observes a token paired with the wrong expiry, and concurrent
/// refreshes collapse into a single issuance. A failed refresh leaves
/// the previous pair in place for other in-flight calls.
pub struct TokenCache {
    inner: Mutex<Option<CachedToken>>,
    margin: Duration,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_margin(Duration::from_secs(10))
    }

    /// `margin` is how close to expiry a cached token may get before it
    /// is refreshed instead of reused.
    pub fn with_margin(margin: Duration) -> Self {
        Self {
            inner: Mutex::new(None),
            margin,
        }
    }

    /// Returns the cached token, refreshing it through `issuer` only
    /// when absent or within the refresh margin of expiry.
    pub async fn ensure_valid(
        &self,
        issuer: &dyn TokenIssuer,
        access_key_id: &str,
        access_key_secret: &str,
    ) -> Result<String, TokenError> {
        let mut guard = self.inner.lock().await;

        if let Some(cached) = guard.as_ref() {
            let remaining = cached.expires_at.saturating_duration_since(Instant::now());
            if remaining >= self.margin {
                return Ok(cached.token.clone());
            }
            tracing::debug!(
                remaining_secs = remaining.as_secs(),
                "cached token near expiry, refreshing"
            );
        }

        match issuer.issue(access_key_id, access_key_secret).await {
            Ok(issued) => {
                let token = issued.token.clone();
                *guard = Some(CachedToken {
                    token: issued.token,
                    expires_at: issued.expires_at,
                });
                Ok(token)
            }
            Err(e) => {
                // Previous pair stays usable for other in-flight calls.
                tracing::error!("token refresh failed: {e}");
                Err(e)
            }
        }
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_backend::NullIssuer;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_cache_issues_token() {
        let cache = TokenCache::new();
        let issuer = NullIssuer::new(Duration::from_secs(3600));

        let token = cache.ensure_valid(&issuer, "id", "secret").await.unwrap();
        assert!(!token.is_empty());
        assert_eq!(issuer.issued(), 1);
    }

    #[tokio::test]
    async fn test_valid_token_is_reused_without_issuance() {
        let cache = TokenCache::new();
        let issuer = NullIssuer::new(Duration::from_secs(100));

        let first = cache.ensure_valid(&issuer, "id", "secret").await.unwrap();
        let second = cache.ensure_valid(&issuer, "id", "secret").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(issuer.issued(), 1);
    }

    #[tokio::test]
    async fn test_token_within_margin_is_refreshed() {
        let cache = TokenCache::new();
        // Valid for less than the 10s margin, so the second call refreshes.
        let issuer = NullIssuer::new(Duration::from_secs(5));

        cache.ensure_valid(&issuer, "id", "secret").await.unwrap();
        cache.ensure_valid(&issuer, "id", "secret").await.unwrap();
        assert_eq!(issuer.issued(), 2);
    }

    #[tokio::test]
    async fn test_margin_controls_refresh_cutoff() {
        // Same short-lived token: a zero margin keeps reusing it, while
        // a margin past its validity forces a refresh on every call.
        let issuer = NullIssuer::new(Duration::from_secs(5));

        let lax = TokenCache::with_margin(Duration::ZERO);
        lax.ensure_valid(&issuer, "id", "secret").await.unwrap();
        lax.ensure_valid(&issuer, "id", "secret").await.unwrap();
        assert_eq!(issuer.issued(), 1);

        let strict = TokenCache::with_margin(Duration::from_secs(60));
        strict.ensure_valid(&issuer, "id", "secret").await.unwrap();
        strict.ensure_valid(&issuer, "id", "secret").await.unwrap();
        assert_eq!(issuer.issued(), 3);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_token() {
        let cache = TokenCache::new();
        let issuer = NullIssuer::new(Duration::from_secs(5));

        let first = cache.ensure_valid(&issuer, "id", "secret").await.unwrap();

        issuer.set_fail(true);
        let err = cache.ensure_valid(&issuer, "id", "secret").await;
        assert!(err.is_err());

        // Recovery picks up where the cache left off, old pair intact
        // until a refresh succeeds.
        issuer.set_fail(false);
        let second = cache.ensure_valid(&issuer, "id", "secret").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_callers_single_issuance() {
        let cache = Arc::new(TokenCache::new());
        let issuer = Arc::new(NullIssuer::new(Duration::from_secs(3600)));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let issuer = Arc::clone(&issuer);
            handles.push(tokio::spawn(async move {
                cache.ensure_valid(issuer.as_ref(), "id", "secret").await
            }));
        }

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert!(!token.is_empty());
        }
        assert_eq!(issuer.issued(), 1);
    }
}
