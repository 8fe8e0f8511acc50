/// Configures the default HTTP transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// `User-Agent` header sent with every request, if set.
    pub user_agent: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: None,
        }
    }
}

impl ClientOptions {
    /// Reads options from environment variables, falling back to defaults.
    ///
    /// Reads:
    /// - `NETKIT_TIMEOUT_MS` — per-request timeout in milliseconds
    /// - `NETKIT_USER_AGENT` — user agent string
    ///
    /// Returns an error if `NETKIT_TIMEOUT_MS` is set but not a positive integer.
    pub fn from_env() -> std::result::Result<Self, String> {
        let mut options = Self::default();

        if let Ok(raw) = std::env::var("NETKIT_TIMEOUT_MS") {
            let timeout_ms = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("NETKIT_TIMEOUT_MS is not an integer: '{raw}'"))?;
            if timeout_ms == 0 {
                return Err("NETKIT_TIMEOUT_MS must be greater than zero".to_owned());
            }
            options.timeout_ms = timeout_ms;
        }

        if let Ok(user_agent) = std::env::var("NETKIT_USER_AGENT") {
            if !user_agent.trim().is_empty() {
                options.user_agent = Some(user_agent.trim().to_owned());
            }
        }

        Ok(options)
    }
}
