//! Public signing keys used to verify bearer tokens.
//!
//! The cache holds one immutable `JwkSet` snapshot. A refresh fetches a whole new set
//! and swaps it in atomically, so concurrent verifications either see the old set or
//! the new one, never a mix. A token whose `kid` is missing from the snapshot triggers a
//! refresh (key rotation); a `kid` still missing afterwards is simply "no key".

use async_trait::async_trait;
use arc_swap::ArcSwapOption;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, thiserror::Error)]
pub enum KeySetError {
    #[error("failed to fetch key set from {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("key set endpoint {url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("key set from {url} is not a valid JWKS document: {reason}")]
    Decode { url: String, reason: String },
}

/// KeySource
///
/// Where a fresh key set comes from. Swapped for `StaticKeySource` in tests.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, KeySetError>;
}

/// RemoteKeySource
///
/// Fetches the JWKS document over HTTP(S). No authentication is sent; the request is
/// bounded by the client timeout so a slow endpoint only stalls the requests waiting on it.
pub struct RemoteKeySource {
    client: reqwest::Client,
    url: String,
}

impl RemoteKeySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KeySource for RemoteKeySource {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| KeySetError::Fetch {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(KeySetError::Status {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        response.json::<JwkSet>().await.map_err(|e| KeySetError::Decode {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }
}

/// StaticKeySource
///
/// Serves a fixed key set. Used by the test suite and for running against locally
/// minted tokens.
#[derive(Clone)]
pub struct StaticKeySource {
    keys: JwkSet,
}

impl StaticKeySource {
    pub fn new(keys: JwkSet) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        Ok(self.keys.clone())
    }
}

/// The result of one fetch, numbered so callers that queued behind it can reuse it.
struct RefreshOutcome {
    attempt: u64,
    result: Result<Arc<JwkSet>, KeySetError>,
}

/// KeySetCache
///
/// The single owner of the current key set snapshot. Shared read-only across requests
/// behind an `Arc`.
pub struct KeySetCache {
    source: Arc<dyn KeySource>,
    current: ArcSwapOption<JwkSet>,
    // Only advanced while `last_refresh` is held.
    attempts: AtomicU64,
    // Serializes fetches and keeps the latest outcome, success or failure, so a burst
    // of misses costs one round trip.
    last_refresh: Mutex<Option<RefreshOutcome>>,
}

impl KeySetCache {
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self {
            source,
            current: ArcSwapOption::empty(),
            attempts: AtomicU64::new(0),
            last_refresh: Mutex::new(None),
        }
    }

    /// The snapshot currently installed, if any fetch has succeeded yet.
    pub fn current(&self) -> Option<Arc<JwkSet>> {
        self.current.load_full()
    }

    /// Fetches a new key set and installs it, replacing the previous snapshot whole.
    pub async fn refresh(&self) -> Result<Arc<JwkSet>, KeySetError> {
        let mut last = self.last_refresh.lock().await;
        self.fetch_and_record(&mut last).await
    }

    /// Finds the key with identifier `kid`, refreshing once if the current snapshot is
    /// empty or does not contain it. Callers that miss while a fetch is in flight wait
    /// for that fetch and share its outcome instead of starting their own.
    pub async fn key_for(&self, kid: &str) -> Result<Option<Jwk>, KeySetError> {
        let seen_attempt = self.attempts.load(Ordering::Acquire);
        if let Some(jwk) = self.current.load_full().as_deref().and_then(|set| set.find(kid)) {
            return Ok(Some(jwk.clone()));
        }

        let mut last = self.last_refresh.lock().await;

        let shared = last
            .as_ref()
            .filter(|outcome| outcome.attempt > seen_attempt)
            .map(|outcome| outcome.result.clone());
        let set = match shared {
            Some(result) => {
                tracing::debug!(kid, "reusing concurrent key set fetch");
                result?
            }
            None => self.fetch_and_record(&mut last).await?,
        };

        Ok(set.find(kid).cloned())
    }

    async fn fetch_and_record(
        &self,
        last: &mut Option<RefreshOutcome>,
    ) -> Result<Arc<JwkSet>, KeySetError> {
        let result = match self.source.fetch().await {
            Ok(set) => {
                let set = Arc::new(set);
                tracing::info!(key_count = set.keys.len(), "installed signing key set");
                self.current.store(Some(Arc::clone(&set)));
                Ok(set)
            }
            Err(err) => {
                tracing::error!(error = %err, "signing key set fetch failed");
                Err(err)
            }
        };

        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        *last = Some(RefreshOutcome {
            attempt,
            result: result.clone(),
        });
        result
    }
}
