use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    time::SystemTime,
};

use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::{
    retry::AttemptFuture, BackoffRetryHandler, CacheEntry, CacheStore, ClientOptions,
    CredentialProvider, HttpRequest, InMemoryCacheStore, NetworkError, NoAuth, RequestDescriptor,
    ReqwestTransport, Result, RetryHandler, Transport,
};

/// Executes [`RequestDescriptor`]s through cache, credentials, transport and
/// retry.
///
/// Cloning is cheap; clones share the same collaborators. The client itself
/// keeps no per-request state, so one instance can serve any number of
/// concurrent calls.
#[derive(Clone)]
pub struct NetworkClient {
    inner: Arc<ClientInner>,
}

#[derive(Clone)]
struct ClientInner {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheStore>,
    credentials: Arc<dyn CredentialProvider>,
    retry: Arc<dyn RetryHandler>,
}

impl fmt::Debug for NetworkClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkClient")
            .field("credentials", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// One credential refresh, shared by every attempt of a top-level call.
struct RefreshBudget {
    available: AtomicBool,
}

impl RefreshBudget {
    fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
        }
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn take(&self) -> bool {
        self.available.swap(false, Ordering::AcqRel)
    }
}

impl NetworkClient {
    /// Creates a client using `credentials`, a `reqwest` transport with
    /// default [`ClientOptions`], an in-memory cache and backoff retry.
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport: Arc::new(ReqwestTransport::default()),
                cache: Arc::new(InMemoryCacheStore::new()),
                credentials,
                retry: Arc::new(BackoffRetryHandler),
            }),
        }
    }

    /// Creates a client that sends requests without credentials.
    pub fn unauthenticated() -> Self {
        Self::new(Arc::new(NoAuth))
    }

    /// Replaces the transport with a `reqwest` transport using `options`.
    pub fn with_options(self, options: ClientOptions) -> Self {
        self.with_transport(Arc::new(ReqwestTransport::new(options)))
    }

    pub fn with_transport(self, transport: Arc<dyn Transport>) -> Self {
        self.map_inner(|inner| inner.transport = transport)
    }

    pub fn with_cache(self, cache: Arc<dyn CacheStore>) -> Self {
        self.map_inner(|inner| inner.cache = cache)
    }

    pub fn with_credentials(self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.map_inner(|inner| inner.credentials = credentials)
    }

    pub fn with_retry_handler(self, retry: Arc<dyn RetryHandler>) -> Self {
        self.map_inner(|inner| inner.retry = retry)
    }

    fn map_inner(self, apply: impl FnOnce(&mut ClientInner)) -> Self {
        let mut inner = ClientInner::clone(&self.inner);
        apply(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns a handle that does not keep the client's collaborators alive.
    pub fn downgrade(&self) -> WeakNetworkClient {
        WeakNetworkClient {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Executes `descriptor` and returns the response body.
    ///
    /// A valid cached entry is returned without touching credentials or the
    /// network. Otherwise the request is authenticated and sent under the
    /// descriptor's retry policy. A `401` triggers at most one credential
    /// refresh per call, after which the request is rebuilt and sent again; a
    /// further `401` surfaces as [`NetworkError::Server`].
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Bytes> {
        if descriptor.cache_policy().should_check_cache() {
            let key = descriptor.cache_key();
            match self.inner.cache.get(&key).await? {
                Some(entry) if entry.is_valid() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(key = %key, "serving response from cache");

                    return Ok(entry.data);
                }
                _stale_or_missing => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        key = %key,
                        expired = _stale_or_missing.is_some(),
                        "cache miss, fetching"
                    );
                }
            }
        }

        let budget = RefreshBudget::new();
        self.inner.fetch(descriptor, &budget).await
    }

    /// Executes `descriptor` and decodes the JSON response body as `T`.
    pub async fn execute_json<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Result<T> {
        let data = self.execute(descriptor).await?;
        serde_json::from_slice(&data)
            .map_err(|err| NetworkError::Decode(format!("invalid response JSON: {err}")))
    }
}

/// Non-owning handle to a [`NetworkClient`], for callbacks and background
/// tasks that must not extend the client's lifetime.
#[derive(Clone, Debug)]
pub struct WeakNetworkClient {
    inner: Weak<ClientInner>,
}

impl WeakNetworkClient {
    /// Upgrades to a full client while any strong handle remains.
    pub fn upgrade(&self) -> Option<NetworkClient> {
        self.inner.upgrade().map(|inner| NetworkClient { inner })
    }

    /// Like [`NetworkClient::execute`], failing with
    /// [`NetworkError::ServiceUnavailable`] once the client has been dropped.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<Bytes> {
        let client = self.upgrade().ok_or(NetworkError::ServiceUnavailable)?;
        client.execute(descriptor).await
    }
}

impl ClientInner {
    /// Authenticates and sends `descriptor` under its retry policy.
    ///
    /// An unauthorized attempt ends the retry loop; the refresh and the
    /// re-executed request then run outside it, and the re-executed result is
    /// final.
    fn fetch<'a>(
        &'a self,
        descriptor: &'a RequestDescriptor,
        budget: &'a RefreshBudget,
    ) -> AttemptFuture<'a> {
        Box::pin(async move {
            let request = descriptor.materialize()?;
            let authenticated = self.credentials.authenticate(&request).await?;
            let authenticated = &authenticated;

            let operation =
                || Box::pin(self.attempt(descriptor, authenticated, budget)) as AttemptFuture<'_>;

            match self.retry.retry(descriptor.retry_policy(), &operation).await {
                Err(NetworkError::Unauthorized) if budget.take() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(url = %authenticated.url, "unauthorized, refreshing credentials");

                    self.credentials.refresh_token().await?;
                    self.fetch(descriptor, budget).await
                }
                Err(NetworkError::Unauthorized) => Err(NetworkError::Server {
                    status: StatusCode::UNAUTHORIZED.as_u16(),
                    message: None,
                }),
                outcome => outcome,
            }
        })
    }

    async fn attempt(
        &self,
        descriptor: &RequestDescriptor,
        request: &HttpRequest,
        budget: &RefreshBudget,
    ) -> Result<Bytes> {
        let response = self.transport.send(request.clone()).await?;

        if response.status == StatusCode::UNAUTHORIZED && budget.is_available() {
            return Err(NetworkError::Unauthorized);
        }

        if !response.status.is_success() {
            let message = (!response.body.is_empty())
                .then(|| String::from_utf8_lossy(&response.body).into_owned());
            return Err(NetworkError::Server {
                status: response.status.as_u16(),
                message,
            });
        }

        if descriptor.cache_policy().should_cache() {
            self.store(descriptor, &response.body).await;
        }

        Ok(response.body)
    }

    /// Best-effort write; a failing cache never fails the request.
    async fn store(&self, descriptor: &RequestDescriptor, data: &Bytes) {
        let key = descriptor.cache_key();
        let entry = CacheEntry::with_ttl(
            data.clone(),
            descriptor.cache_policy().ttl(),
            SystemTime::now(),
        );

        if let Err(err) = self.cache.save(&key, entry).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(key = %key, error = %err, "failed to write response to cache");

            #[cfg(not(feature = "tracing"))]
            let _ = err;
        }
    }
}
