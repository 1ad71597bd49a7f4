use std::{env, fmt, num::NonZeroUsize, time::Duration};

use super::{error::ConfigError, rest::models::DataFeed};

pub(crate) const API_KEY_ENV: &str = "API_KEY";
pub(crate) const SECRET_KEY_ENV: &str = "SECRET_KEY";

const DEFAULT_BARS_SYMBOLS_PER_REQUEST: NonZeroUsize = NonZeroUsize::MIN.saturating_add(199);

/// Broker API credentials.
///
/// The secret is never printed by the `Debug` implementation.
#[derive(Clone)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    pub fn new(key: impl ToString, secret: impl ToString) -> Self {
        Self {
            key: key.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Reads the credentials from the `API_KEY` and `SECRET_KEY` environment variables.
    ///
    /// Missing or empty values are configuration errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let key = Self::read_var(API_KEY_ENV)?;
        let secret = Self::read_var(SECRET_KEY_ENV)?;

        Ok(Self { key, secret })
    }

    fn read_var(name: &'static str) -> Result<String, ConfigError> {
        match env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::MissingEnvVar(name)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for the broker REST clients and streaming connections.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use premarket_perk::api::ApiClientConfig;
///
/// let config = ApiClientConfig::default()
///     .with_rest_timeout(Duration::from_secs(30))
///     .with_paper(false);
/// assert!(!config.paper());
/// ```
#[derive(Clone, Debug)]
pub struct ApiClientConfig {
    paper: bool,
    data_feed: DataFeed,
    rest_timeout: Duration,
    bars_symbols_per_request: NonZeroUsize,
    ws_heartbeat_interval: Duration,
    ws_reconnect_min_backoff: Duration,
    ws_reconnect_max_backoff: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            paper: true,
            data_feed: DataFeed::Sip,
            rest_timeout: Duration::from_secs(20),
            bars_symbols_per_request: DEFAULT_BARS_SYMBOLS_PER_REQUEST,
            ws_heartbeat_interval: Duration::from_secs(10),
            ws_reconnect_min_backoff: Duration::from_secs(1),
            ws_reconnect_max_backoff: Duration::from_secs(30),
        }
    }
}

impl ApiClientConfig {
    /// Returns whether the paper trading environment is used.
    pub fn paper(&self) -> bool {
        self.paper
    }

    /// Returns the market data feed used for historical bars and live trades.
    pub fn data_feed(&self) -> DataFeed {
        self.data_feed
    }

    /// Returns the timeout for REST API requests.
    pub fn rest_timeout(&self) -> Duration {
        self.rest_timeout
    }

    /// Returns the maximum number of symbols sent in a single bars request.
    pub fn bars_symbols_per_request(&self) -> NonZeroUsize {
        self.bars_symbols_per_request
    }

    /// Returns the silence interval after which a stream connection is pinged. A connection that
    /// stays silent for another interval is considered dead.
    pub fn ws_heartbeat_interval(&self) -> Duration {
        self.ws_heartbeat_interval
    }

    /// Returns the first delay applied before reconnecting a failed stream.
    pub fn ws_reconnect_min_backoff(&self) -> Duration {
        self.ws_reconnect_min_backoff
    }

    /// Returns the upper bound for the stream reconnect delay.
    pub fn ws_reconnect_max_backoff(&self) -> Duration {
        self.ws_reconnect_max_backoff
    }

    /// Sets whether the paper trading environment is used.
    ///
    /// Default: `true`
    pub fn with_paper(mut self, paper: bool) -> Self {
        self.paper = paper;
        self
    }

    /// Sets the market data feed.
    ///
    /// Default: [`DataFeed::Sip`]
    pub fn with_data_feed(mut self, data_feed: DataFeed) -> Self {
        self.data_feed = data_feed;
        self
    }

    /// Sets the REST API request timeout.
    ///
    /// Default: `20` seconds
    pub fn with_rest_timeout(mut self, timeout: Duration) -> Self {
        self.rest_timeout = timeout;
        self
    }

    /// Sets the maximum number of symbols sent in a single bars request.
    ///
    /// Default: `200`
    pub fn with_bars_symbols_per_request(mut self, symbols: NonZeroUsize) -> Self {
        self.bars_symbols_per_request = symbols;
        self
    }

    /// Sets the stream heartbeat interval.
    ///
    /// Default: `10` seconds
    pub fn with_ws_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.ws_heartbeat_interval = interval;
        self
    }

    /// Sets the stream reconnect backoff bounds. `max` is raised to `min` if lower.
    ///
    /// Default: `1` second to `30` seconds
    pub fn with_ws_reconnect_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.ws_reconnect_min_backoff = min;
        self.ws_reconnect_max_backoff = max.max(min);
        self
    }
}
