//! Provider signing-key set, fetched once per process
//!
//! The first caller that needs keys triggers OIDC discovery followed by the
//! JWKS download. The result is kept for the lifetime of the cache; there is
//! no TTL and no rotation handling.
//!
//! # Single-flight
//!
//! The fetch runs on its own spawned task and its completion is shared by
//! every caller that arrives while it is pending, so N concurrent callers
//! produce exactly one discovery request and one JWKS request. A caller
//! that stops waiting (request abandoned, timeout) only drops its handle to
//! the shared completion; the fetch keeps going for everyone else.
//!
//! A failed fetch is reported to all of its waiters and then forgotten, so
//! the next call starts a fresh attempt. Nothing is retried automatically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use jsonwebtoken::jwk::JwkSet;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::AuthSettings;
use crate::error::KeySetError;

type KeySetResult = Result<Arc<JwkSet>, KeySetError>;
type PendingFetch = Shared<BoxFuture<'static, KeySetResult>>;

/// The part of the OIDC discovery document we use
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    #[serde(default)]
    jwks_uri: Option<String>,
}

struct Inner {
    discovery_url: String,
    http_client: reqwest::Client,
    /// Written once by the winning fetch, read without locking afterwards
    keys: OnceLock<Arc<JwkSet>>,
    /// The fetch currently in progress, if any
    pending: Mutex<Option<PendingFetch>>,
    fetches: AtomicU64,
}

/// Process-lifetime cache of the provider's JSON Web Key Set
///
/// Cheap to clone; clones share the same cached keys and in-flight fetch.
///
/// # Example
///
/// ```rust,no_run
/// # use scoutview_auth::{AuthSettings, jwt::KeySetCache};
/// # tokio_test::block_on(async {
/// let settings = AuthSettings::builder()
///     .keycloak_url("https://id.example.org")
///     .realm("scouts")
///     .client_id("scoutview")
///     .build()?;
///
/// let cache = KeySetCache::new(&settings)?;
/// let keys = cache.get_keys().await?;
/// println!("provider publishes {} keys", keys.keys.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Clone)]
pub struct KeySetCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for KeySetCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySetCache")
            .field("discovery_url", &self.inner.discovery_url)
            .field("populated", &self.is_populated())
            .field("fetches", &self.fetch_count())
            .finish()
    }
}

impl KeySetCache {
    /// Create a cache for the realm described by `settings`
    ///
    /// No network access happens until [`get_keys`](Self::get_keys) is first
    /// called.
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(settings: &AuthSettings) -> Result<Self, KeySetError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.http_timeout())
            .build()
            .map_err(|e| KeySetError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(settings.discovery_url(), http_client))
    }

    /// Create a cache with an explicit discovery URL and HTTP client
    pub fn with_client(discovery_url: impl Into<String>, http_client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(Inner {
                discovery_url: discovery_url.into(),
                http_client,
                keys: OnceLock::new(),
                pending: Mutex::new(None),
                fetches: AtomicU64::new(0),
            }),
        }
    }

    /// Get the provider's key set, fetching it on first use
    ///
    /// # Errors
    ///
    /// Returns a [`KeySetError`] if the discovery document cannot be
    /// retrieved, lacks a `jwks_uri`, or the key set cannot be retrieved.
    pub async fn get_keys(&self) -> Result<Arc<JwkSet>, KeySetError> {
        if let Some(keys) = self.inner.keys.get() {
            debug!("Using cached JWKS");
            return Ok(Arc::clone(keys));
        }

        let fetch = {
            let mut pending = self.inner.pending.lock();
            // The fetch may have completed while we waited for the lock
            if let Some(keys) = self.inner.keys.get() {
                return Ok(Arc::clone(keys));
            }
            match pending.as_ref() {
                Some(fetch) => {
                    debug!("Joining in-flight JWKS fetch");
                    fetch.clone()
                }
                None => {
                    let fetch = Inner::spawn_fetch(Arc::clone(&self.inner));
                    *pending = Some(fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Whether the key set has been fetched successfully
    pub fn is_populated(&self) -> bool {
        self.inner.keys.get().is_some()
    }

    /// Number of fetch attempts started so far
    pub fn fetch_count(&self) -> u64 {
        self.inner.fetches.load(Ordering::Relaxed)
    }

    /// Discovery document location
    pub fn discovery_url(&self) -> &str {
        &self.inner.discovery_url
    }
}

impl Inner {
    /// Start a fetch on its own task; must be called with `pending` locked
    fn spawn_fetch(inner: Arc<Self>) -> PendingFetch {
        inner.fetches.fetch_add(1, Ordering::Relaxed);

        let task = tokio::spawn(async move {
            // Dropped last, after `keys` is published, and also on unwind
            let _clear = ClearPending(&inner);
            let result = inner.fetch().await.map(Arc::new);
            match &result {
                Ok(keys) => {
                    let _ = inner.keys.set(Arc::clone(keys));
                }
                Err(e) => {
                    error!(discovery_url = %inner.discovery_url, error = %e, "JWKS fetch failed");
                }
            }
            result
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(KeySetError::FetchAborted(e.to_string())))
        }
        .boxed()
        .shared()
    }

    async fn fetch(&self) -> Result<JwkSet, KeySetError> {
        info!(discovery_url = %self.discovery_url, "Fetching OIDC discovery document");

        let response = self
            .http_client
            .get(&self.discovery_url)
            .send()
            .await
            .map_err(|e| KeySetError::DiscoveryUnreachable {
                url: self.discovery_url.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(KeySetError::DiscoveryStatus {
                url: self.discovery_url.clone(),
                status: response.status().as_u16(),
            });
        }

        let discovery: DiscoveryDocument =
            response
                .json()
                .await
                .map_err(|e| KeySetError::DiscoveryMalformed {
                    url: self.discovery_url.clone(),
                    reason: e.to_string(),
                })?;

        let jwks_uri = discovery
            .jwks_uri
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| KeySetError::MissingJwksUri {
                url: self.discovery_url.clone(),
            })?;

        info!(jwks_uri = %jwks_uri, "Fetching JWKS from endpoint");

        let response = self.http_client.get(&jwks_uri).send().await.map_err(|e| {
            KeySetError::KeySetUnreachable {
                url: jwks_uri.clone(),
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(KeySetError::KeySetStatus {
                url: jwks_uri,
                status: response.status().as_u16(),
            });
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| KeySetError::KeySetMalformed {
                url: jwks_uri.clone(),
                reason: e.to_string(),
            })?;

        info!(
            jwks_uri = %jwks_uri,
            key_count = jwks.keys.len(),
            "Successfully fetched JWKS"
        );

        Ok(jwks)
    }
}

/// Empties the in-flight slot when the fetch task ends, however it ends
struct ClearPending<'a>(&'a Inner);

impl Drop for ClearPending<'_> {
    fn drop(&mut self) {
        *self.0.pending.lock() = None;
    }
}
