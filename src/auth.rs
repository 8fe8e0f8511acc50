use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use reqwest::header::{self, HeaderValue};
use tokio::sync::{Mutex, RwLock};

use crate::{HttpRequest, NetworkError, Result};

/// Attaches credentials to outgoing requests and refreshes them on demand.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns an authenticated copy of `request`.
    async fn authenticate(&self, request: &HttpRequest) -> Result<HttpRequest>;

    /// Refreshes stored credential state.
    ///
    /// May be called concurrently by several in-flight requests.
    async fn refresh_token(&self) -> Result<()>;
}

/// Sends requests unauthenticated.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuth;

#[async_trait]
impl CredentialProvider for NoAuth {
    async fn authenticate(&self, request: &HttpRequest) -> Result<HttpRequest> {
        Ok(request.clone())
    }

    async fn refresh_token(&self) -> Result<()> {
        Ok(())
    }
}

/// Source of fresh bearer tokens for [`BearerAuth`].
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn fetch_token(&self) -> Result<String>;
}

/// `Authorization: Bearer <token>` credentials with optional refresh.
pub struct BearerAuth {
    authorization: RwLock<String>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    refresh_lock: Mutex<()>,
    generation: AtomicU64,
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("authorization", &"<redacted>")
            .field("refreshable", &self.refresher.is_some())
            .field("generation", &self.generation.load(Ordering::Acquire))
            .finish()
    }
}

impl BearerAuth {
    /// Static token. If it is missing the `Bearer ` prefix, it is added.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self {
            authorization: RwLock::new(normalize_bearer_authorization(token.as_ref())),
            refresher: None,
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Token that is replaced by `refresher` whenever a refresh is requested.
    pub fn with_refresher(token: impl AsRef<str>, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            refresher: Some(refresher),
            ..Self::new(token)
        }
    }

    /// Number of completed refreshes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CredentialProvider for BearerAuth {
    async fn authenticate(&self, request: &HttpRequest) -> Result<HttpRequest> {
        let authorization = self.authorization.read().await;
        let mut value = HeaderValue::from_str(&authorization).map_err(|_| {
            NetworkError::Credential("token is not a valid header value".to_owned())
        })?;
        value.set_sensitive(true);
        Ok(request.with_header(header::AUTHORIZATION, value))
    }

    async fn refresh_token(&self) -> Result<()> {
        let Some(refresher) = &self.refresher else {
            return Ok(());
        };

        let seen = self.generation.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;
        // Another caller refreshed while this one waited for the lock.
        if self.generation.load(Ordering::Acquire) != seen {
            return Ok(());
        }

        let token = refresher.fetch_token().await?;
        *self.authorization.write().await = normalize_bearer_authorization(&token);
        self.generation.fetch_add(1, Ordering::AcqRel);

        #[cfg(feature = "tracing")]
        tracing::debug!(generation = seen + 1, "bearer token refreshed");

        Ok(())
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
