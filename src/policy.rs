use std::time::Duration;

/// How a request interacts with the response cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Always go to the network and never store the response.
    #[default]
    NoCache,
    /// Serve a valid cached entry if there is one, otherwise fetch and store.
    ///
    /// Stored entries expire `ttl` after the write; `None` never expires.
    ReadThenFetch { ttl: Option<Duration> },
    /// Serve a valid cached entry if there is one.
    ///
    /// A miss still falls through to a live fetch, whose response is stored
    /// without expiry.
    ReadOnly,
}

impl CachePolicy {
    /// Shorthand for [`CachePolicy::ReadThenFetch`] with a TTL.
    pub fn read_then_fetch(ttl: Duration) -> Self {
        Self::ReadThenFetch { ttl: Some(ttl) }
    }

    pub fn should_check_cache(&self) -> bool {
        !matches!(self, Self::NoCache)
    }

    pub fn should_cache(&self) -> bool {
        !matches!(self, Self::NoCache)
    }

    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Self::ReadThenFetch { ttl } => *ttl,
            Self::NoCache | Self::ReadOnly => None,
        }
    }
}

/// Retry settings carried by each request descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Delay before the first retry, before jitter and clamping.
    pub base_delay: Duration,
    /// Growth factor applied per attempt. Values below 1 behave as 1.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_retries,
            base_delay,
            backoff_multiplier,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Total number of attempts the policy allows.
    pub fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{CachePolicy, RetryPolicy};

    #[test]
    fn no_cache_skips_read_and_write() {
        let policy = CachePolicy::default();
        assert!(!policy.should_check_cache());
        assert!(!policy.should_cache());
        assert_eq!(policy.ttl(), None);
    }

    #[test]
    fn read_only_stores_without_ttl() {
        assert!(CachePolicy::ReadOnly.should_check_cache());
        assert!(CachePolicy::ReadOnly.should_cache());
        assert_eq!(CachePolicy::ReadOnly.ttl(), None);
    }

    #[test]
    fn read_then_fetch_exposes_ttl() {
        let policy = CachePolicy::read_then_fetch(Duration::from_secs(30));
        assert!(policy.should_check_cache());
        assert_eq!(policy.ttl(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn default_retry_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.backoff_multiplier, 2.0);
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }
}
