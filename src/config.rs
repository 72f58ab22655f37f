//! Client configuration.

use std::time::Duration;

/// Default cloud login endpoint
pub const DEFAULT_LOGIN_URL: &str = "https://cloud.crownstone.rocks/api/users/login";

/// Default event stream endpoint, the access token is appended as `accessToken` query
pub const DEFAULT_EVENTS_URL: &str = "https://events.crownstone.rocks/sse";

/// Delay between reconnection attempts
pub const RECONNECTION_TIME: Duration = Duration::from_secs(30);

/// The server sends a ping every 30 seconds, 35 seconds without any data means the connection is dead
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(35);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_LABEL: &str = "crownstone-sse";

/// How long to wait before reconnecting after a connection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Always wait the same amount of time
    Fixed(Duration),
    /// Start at `initial`, double after every failed attempt, never exceed `max`.
    /// Resets to `initial` once a stream is opened.
    Exponential {
        /// first delay
        initial: Duration,
        /// upper bound
        max: Duration,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Fixed(RECONNECTION_TIME)
    }
}

/// Client configuration knobs.
///
/// ```
/// use std::time::Duration;
/// use crownstone_sse::config::{Config, ReconnectPolicy};
///
/// let config = Config::default()
///     .with_label("living-room")
///     .with_reconnect(ReconnectPolicy::Exponential {
///         initial: Duration::from_secs(1),
///         max: Duration::from_secs(60),
///     });
///
/// assert_eq!(config.idle_timeout, Duration::from_secs(35));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// login endpoint
    pub login_url: String,
    /// event stream endpoint
    pub events_url: String,
    /// reconnect wait policy
    pub reconnect: ReconnectPolicy,
    /// longest time the stream may stay silent before it is considered dead
    pub idle_timeout: Duration,
    /// tcp connect timeout, used when this crate builds the http client
    pub connect_timeout: Duration,
    /// total timeout of the login request, the event stream itself has none
    pub request_timeout: Duration,
    /// externally supplied http client, a default one is built when `None`
    pub http_client: Option<reqwest::Client>,
    /// prefix for log lines of this client
    pub label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            events_url: DEFAULT_EVENTS_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
            idle_timeout: CONNECTION_TIMEOUT,
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: CONNECT_TIMEOUT,
            http_client: None,
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl Config {
    /// set login endpoint
    pub fn with_login_url<S: Into<String>>(mut self, url: S) -> Self {
        self.login_url = url.into();
        self
    }

    /// set event stream endpoint
    pub fn with_events_url<S: Into<String>>(mut self, url: S) -> Self {
        self.events_url = url.into();
        self
    }

    /// set reconnect policy
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// set fixed reconnect delay
    pub fn with_reconnect_delay(self, delay: Duration) -> Self {
        self.with_reconnect(ReconnectPolicy::Fixed(delay))
    }

    /// set idle timeout of the event stream
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// set login request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// use an existing http client instead of building one
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// set log label
    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }
}
