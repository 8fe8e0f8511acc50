use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Method, Url,
};
use serde::Serialize;

use crate::{CachePolicy, HttpMethod, NetworkError, Result, RetryPolicy};

/// Immutable description of one logical request and its cache/retry policy.
///
/// Built once through the consuming `with_*` methods; everything derived from
/// it ([`cache_key`](Self::cache_key), [`materialize`](Self::materialize)) is a
/// new value.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    url: Url,
    method: HttpMethod,
    headers: BTreeMap<String, String>,
    query_items: BTreeMap<String, String>,
    body: Option<Bytes>,
    cache_policy: CachePolicy,
    retry_policy: RetryPolicy,
}

impl RequestDescriptor {
    /// Parses `url` and creates a descriptor with default policies.
    pub fn new(method: HttpMethod, url: impl AsRef<str>) -> Result<Self> {
        let raw = url.as_ref().trim();
        let url = Url::parse(raw).map_err(|err| NetworkError::InvalidUrl(format!("{raw}: {err}")))?;
        Ok(Self::from_url(method, url))
    }

    /// Shorthand for a `GET` descriptor.
    pub fn get(url: impl AsRef<str>) -> Result<Self> {
        Self::new(HttpMethod::Get, url)
    }

    pub fn from_url(method: HttpMethod, url: Url) -> Self {
        Self {
            url,
            method,
            headers: BTreeMap::new(),
            query_items: BTreeMap::new(),
            body: None,
            cache_policy: CachePolicy::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Adds a header; a later value for the same name replaces the earlier one.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_items.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON request body.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)
            .map_err(|err| NetworkError::Encode(format!("failed to encode request body: {err}")))?;
        Ok(self.with_body(body))
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn query_items(&self) -> &BTreeMap<String, String> {
        &self.query_items
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// The URL with query items appended after any query already present.
    pub fn resolved_url(&self) -> Url {
        let mut url = self.url.clone();
        if !self.query_items.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query_items {
                pairs.append_pair(name, value);
            }
        }
        url
    }

    /// Cache identity of this request: the resolved URL string.
    ///
    /// Headers and body are not part of the key.
    pub fn cache_key(&self) -> String {
        self.resolved_url().to_string()
    }

    /// Builds the outgoing request: resolved URL, method, body, and a default
    /// `Content-Type: application/json` that descriptor headers may override.
    pub fn materialize(&self) -> Result<HttpRequest> {
        let mut headers = HeaderMap::with_capacity(self.headers.len() + 1);
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| NetworkError::InvalidHeader(format!("invalid name '{name}'")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| NetworkError::InvalidHeader(format!("invalid value for '{name}'")))?;
            headers.insert(header_name, header_value);
        }

        Ok(HttpRequest {
            method: self.method.into(),
            url: self.resolved_url(),
            headers,
            body: self.body.clone(),
        })
    }
}

/// A fully materialized outgoing request.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Returns a copy of this request with `name` set to `value`.
    pub fn with_header(&self, name: HeaderName, value: HeaderValue) -> Self {
        let mut next = self.clone();
        next.headers.insert(name, value);
        next
    }

    /// Header value as text, if present and valid UTF-8.
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}
