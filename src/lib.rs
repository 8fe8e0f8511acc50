//! `netkit-http` is an async HTTP request pipeline.
//!
//! [`NetworkClient::execute`] takes an immutable [`RequestDescriptor`] and runs
//! it through:
//! - a [`CacheStore`] lookup, governed by the descriptor's [`CachePolicy`]
//! - a [`CredentialProvider`], refreshed once when the server answers `401`
//! - a [`Transport`] call wrapped in a [`RetryHandler`] with jittered
//!   exponential backoff
//!
//! Every collaborator is a trait object chosen at construction time.

mod auth;
mod cache;
mod client;
mod disk;
mod error;
mod method;
mod options;
mod policy;
mod request;
pub mod retry;
mod transport;

pub use auth::{BearerAuth, CredentialProvider, NoAuth, TokenRefresher};
pub use cache::{CacheEntry, CacheStore, InMemoryCacheStore, NoopCacheStore};
pub use client::{NetworkClient, WeakNetworkClient};
pub use disk::FileCacheStore;
pub use error::NetworkError;
pub use method::HttpMethod;
pub use options::ClientOptions;
pub use policy::{CachePolicy, RetryPolicy};
pub use request::{HttpRequest, RequestDescriptor};
pub use retry::{BackoffRetryHandler, NoRetry, RetryHandler};
pub use transport::{HttpResponse, ReqwestTransport, Transport};

pub type Result<T> = std::result::Result<T, NetworkError>;
