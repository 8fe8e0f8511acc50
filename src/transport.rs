use std::{fmt, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::HeaderMap, StatusCode};

use crate::{ClientOptions, HttpRequest, NetworkError, Result};

/// Response of a single transport round trip.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Sends one request over the network.
///
/// Connectivity failures are errors; every HTTP status, including 4xx and
/// 5xx, is a successful send.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`Transport`] backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    options: ClientOptions,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("options", &self.options)
            .finish()
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl ReqwestTransport {
    pub fn new(options: ClientOptions) -> Self {
        Self::with_client(reqwest::Client::new(), options)
    }

    /// Uses a preconfigured `reqwest` client (proxies, TLS roots, pools).
    pub fn with_client(http: reqwest::Client, options: ClientOptions) -> Self {
        Self { http, options }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .http
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(Duration::from_millis(self.options.timeout_ms));

        if let Some(user_agent) = &self.options.user_agent {
            builder = builder.header(reqwest::header::USER_AGENT, user_agent);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(NetworkError::Transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| NetworkError::InvalidResponse(format!("failed to read body: {err}")))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
