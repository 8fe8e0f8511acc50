/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The request URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// A descriptor header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The response could not be read as an HTTP response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The client behind a weak handle has been dropped.
    #[error("network service is no longer available")]
    ServiceUnavailable,
    /// `401` answered while a credential refresh is still available.
    ///
    /// Stops the retry loop so the client can refresh and re-send; callers
    /// see [`NetworkError::Server`] with status `401` instead.
    #[error("unauthorized, credentials must be refreshed")]
    Unauthorized,
    /// Non-success HTTP status code, with the response body when present.
    #[error("server error {status}")]
    Server {
        status: u16,
        /// Raw response body text, if the server sent one.
        message: Option<String>,
    },
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Credential provider failed to authenticate or refresh.
    #[error("credential error: {0}")]
    Credential(String),
    /// Cache store failed to read or write an entry.
    #[error("cache error: {0}")]
    Cache(String),
    /// Request body could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
    /// Response body did not decode into the requested type.
    #[error("decode error: {0}")]
    Decode(String),
    /// Retries ran out without a captured cause.
    #[error("unknown network error")]
    Unknown,
}

impl NetworkError {
    /// Returns the HTTP status code carried by [`NetworkError::Server`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Whether a retry handler may run the attempt again.
    ///
    /// Credential failures and pending refreshes end the retry loop
    /// regardless of the handler's own policy.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Credential(_) | Self::Unauthorized)
    }
}
