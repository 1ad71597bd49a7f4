use chrono::{Days, Duration, NaiveTime};
use chrono_tz::{Tz, US::Eastern};
use tokio::time;

use crate::{
    api::{
        ApiClientConfig,
        rest::models::{AssetFilter, DataFeed},
    },
    scan::ScannerConfig,
    session::SessionParams,
    shared::{PercentChange, PriceBand},
};

const DEFAULT_SESSION_CUTOFF: NaiveTime = match NaiveTime::from_hms_opt(16, 0, 0) {
    Some(time) => time,
    None => panic!("invalid default session cutoff"),
};

const DEFAULT_PREMARKET_OPEN: NaiveTime = match NaiveTime::from_hms_opt(4, 0, 0) {
    Some(time) => time,
    None => panic!("invalid default premarket open"),
};

/// Configuration for the [`TradingBot`](crate::bot::TradingBot): thresholds, session timing,
/// scan windows and broker connectivity.
///
/// # Examples
///
/// ```
/// use premarket_perk::{bot::BotConfig, models::PercentChange};
///
/// let config = BotConfig::default()
///     .with_min_premarket_percent_change(PercentChange::try_from(45.).unwrap())
///     .with_liquidation_lead_secs(900);
/// assert_eq!(config.liquidation_lead().as_secs(), 900);
/// ```
#[derive(Clone, Debug)]
pub struct BotConfig {
    min_premarket_percent_change: PercentChange,
    tz: Tz,
    price_band: PriceBand,
    liquidation_lead: time::Duration,
    session_cutoff: NaiveTime,
    premarket_open: NaiveTime,
    recent_calendar_lookback_days: u64,
    year_lookback: Duration,
    bars_end_delay: Duration,
    data_feed: DataFeed,
    paper: bool,
    rest_api_timeout: time::Duration,
    ws_heartbeat_interval: time::Duration,
    ws_reconnect_min_backoff: time::Duration,
    ws_reconnect_max_backoff: time::Duration,
    subscribe_retry_interval: time::Duration,
    subscribe_max_wait: time::Duration,
    shutdown_timeout: time::Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            min_premarket_percent_change: PercentChange::default(),
            tz: Eastern,
            price_band: PriceBand::default(),
            liquidation_lead: time::Duration::from_secs(1_800),
            session_cutoff: DEFAULT_SESSION_CUTOFF,
            premarket_open: DEFAULT_PREMARKET_OPEN,
            recent_calendar_lookback_days: 14,
            year_lookback: Duration::days(365),
            bars_end_delay: Duration::minutes(15),
            data_feed: DataFeed::Sip,
            paper: true,
            rest_api_timeout: time::Duration::from_secs(20),
            ws_heartbeat_interval: time::Duration::from_secs(10),
            ws_reconnect_min_backoff: time::Duration::from_secs(1),
            ws_reconnect_max_backoff: time::Duration::from_secs(30),
            subscribe_retry_interval: time::Duration::from_secs(1),
            subscribe_max_wait: time::Duration::from_secs(60),
            shutdown_timeout: time::Duration::from_secs(6),
        }
    }
}

impl BotConfig {
    /// Returns the minimum premarket rise over the previous close that a symbol's threshold
    /// price represents.
    pub fn min_premarket_percent_change(&self) -> PercentChange {
        self.min_premarket_percent_change
    }

    /// Returns the exchange time zone.
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Returns the band a symbol's close must lie in to be watched.
    pub fn price_band(&self) -> PriceBand {
        self.price_band
    }

    /// Returns how long before the session close positions are liquidated.
    pub fn liquidation_lead(&self) -> time::Duration {
        self.liquidation_lead
    }

    /// Returns the local time from which bars are considered post-market.
    pub fn session_cutoff(&self) -> NaiveTime {
        self.session_cutoff
    }

    /// Returns the local premarket-open estimate used when no session is ahead.
    pub fn premarket_open(&self) -> NaiveTime {
        self.premarket_open
    }

    pub fn recent_calendar_lookback_days(&self) -> u64 {
        self.recent_calendar_lookback_days
    }

    pub fn year_lookback(&self) -> Duration {
        self.year_lookback
    }

    /// Returns how far behind the current time historical requests end.
    pub fn bars_end_delay(&self) -> Duration {
        self.bars_end_delay
    }

    pub fn data_feed(&self) -> DataFeed {
        self.data_feed
    }

    pub fn paper(&self) -> bool {
        self.paper
    }

    pub fn rest_api_timeout(&self) -> time::Duration {
        self.rest_api_timeout
    }

    pub fn ws_heartbeat_interval(&self) -> time::Duration {
        self.ws_heartbeat_interval
    }

    pub fn ws_reconnect_min_backoff(&self) -> time::Duration {
        self.ws_reconnect_min_backoff
    }

    pub fn ws_reconnect_max_backoff(&self) -> time::Duration {
        self.ws_reconnect_max_backoff
    }

    /// Returns the delay between subscription attempts while the data stream is not connected.
    pub fn subscribe_retry_interval(&self) -> time::Duration {
        self.subscribe_retry_interval
    }

    /// Returns how long a cycle keeps deferring its subscription before running without one.
    pub fn subscribe_max_wait(&self) -> time::Duration {
        self.subscribe_max_wait
    }

    /// Returns the timeout for graceful shutdown before the bot is aborted.
    pub fn shutdown_timeout(&self) -> time::Duration {
        self.shutdown_timeout
    }

    /// Sets the minimum premarket percent change.
    ///
    /// Default: `30`%
    pub fn with_min_premarket_percent_change(mut self, change: PercentChange) -> Self {
        self.min_premarket_percent_change = change;
        self
    }

    /// Sets the exchange time zone.
    ///
    /// Default: `US/Eastern`
    pub fn with_tz(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    /// Sets the close price band.
    ///
    /// Default: `(0.8, 20)`
    pub fn with_price_band(mut self, band: PriceBand) -> Self {
        self.price_band = band;
        self
    }

    /// Sets the liquidation lead time.
    ///
    /// Default: `1800` seconds
    pub fn with_liquidation_lead_secs(mut self, secs: u64) -> Self {
        self.liquidation_lead = time::Duration::from_secs(secs);
        self
    }

    /// Sets the post-market cutoff.
    ///
    /// Default: `16:00`
    pub fn with_session_cutoff(mut self, cutoff: NaiveTime) -> Self {
        self.session_cutoff = cutoff;
        self
    }

    /// Sets the premarket-open estimate.
    ///
    /// Default: `04:00`
    pub fn with_premarket_open(mut self, open: NaiveTime) -> Self {
        self.premarket_open = open;
        self
    }

    /// Sets how many days of calendar are requested to locate recent sessions.
    ///
    /// Default: `14`
    pub fn with_recent_calendar_lookback_days(mut self, days: u64) -> Self {
        self.recent_calendar_lookback_days = days;
        self
    }

    /// Sets the year-bars lookback.
    ///
    /// Default: `365` days
    pub fn with_year_lookback(mut self, lookback: Duration) -> Self {
        self.year_lookback = lookback;
        self
    }

    /// Sets the historical request end delay.
    ///
    /// Default: `15` minutes
    pub fn with_bars_end_delay(mut self, delay: Duration) -> Self {
        self.bars_end_delay = delay;
        self
    }

    /// Sets the market data feed.
    ///
    /// Default: [`DataFeed::Sip`]
    pub fn with_data_feed(mut self, feed: DataFeed) -> Self {
        self.data_feed = feed;
        self
    }

    /// Sets whether the paper trading environment is used.
    ///
    /// Default: `true`
    pub fn with_paper(mut self, paper: bool) -> Self {
        self.paper = paper;
        self
    }

    /// Sets the REST API request timeout.
    ///
    /// Default: `20` seconds
    pub fn with_rest_api_timeout(mut self, secs: u64) -> Self {
        self.rest_api_timeout = time::Duration::from_secs(secs);
        self
    }

    /// Sets the stream heartbeat interval.
    ///
    /// Default: `10` seconds
    pub fn with_ws_heartbeat_interval(mut self, secs: u64) -> Self {
        self.ws_heartbeat_interval = time::Duration::from_secs(secs);
        self
    }

    /// Sets the stream reconnect backoff bounds.
    ///
    /// Default: `1` to `30` seconds
    pub fn with_ws_reconnect_backoff(mut self, min_secs: u64, max_secs: u64) -> Self {
        self.ws_reconnect_min_backoff = time::Duration::from_secs(min_secs);
        self.ws_reconnect_max_backoff = time::Duration::from_secs(max_secs.max(min_secs));
        self
    }

    /// Sets the subscription retry interval.
    ///
    /// Default: `1` second
    pub fn with_subscribe_retry_interval(mut self, interval: time::Duration) -> Self {
        self.subscribe_retry_interval = interval;
        self
    }

    /// Sets the maximum subscription deferral. A cycle whose data stream stays disconnected for
    /// this long skips its subscription and still liquidates before the close.
    ///
    /// Default: `60` seconds
    pub fn with_subscribe_max_wait(mut self, max_wait: time::Duration) -> Self {
        self.subscribe_max_wait = max_wait;
        self
    }

    /// Sets the graceful shutdown timeout.
    ///
    /// Default: `6` seconds
    pub fn with_shutdown_timeout(mut self, secs: u64) -> Self {
        self.shutdown_timeout = time::Duration::from_secs(secs);
        self
    }
}

impl From<&BotConfig> for ApiClientConfig {
    fn from(value: &BotConfig) -> Self {
        ApiClientConfig::default()
            .with_paper(value.paper())
            .with_data_feed(value.data_feed())
            .with_rest_timeout(value.rest_api_timeout())
            .with_ws_heartbeat_interval(value.ws_heartbeat_interval())
            .with_ws_reconnect_backoff(
                value.ws_reconnect_min_backoff(),
                value.ws_reconnect_max_backoff(),
            )
    }
}

impl From<&BotConfig> for ScannerConfig {
    fn from(value: &BotConfig) -> Self {
        Self {
            tz: value.tz(),
            session_cutoff: value.session_cutoff(),
            price_band: value.price_band(),
            asset_filter: AssetFilter::default(),
            data_feed: value.data_feed(),
            recent_calendar_lookback: Days::new(value.recent_calendar_lookback_days()),
            year_lookback: value.year_lookback(),
            bars_end_delay: value.bars_end_delay(),
        }
    }
}

impl From<&BotConfig> for SessionParams {
    fn from(value: &BotConfig) -> Self {
        SessionParams::new(value.tz(), value.premarket_open())
    }
}

#[derive(Clone, Debug)]
pub(super) struct BotProcessConfig {
    min_premarket_percent_change: PercentChange,
    liquidation_lead: time::Duration,
    subscribe_retry_interval: time::Duration,
    subscribe_max_wait: time::Duration,
}

impl BotProcessConfig {
    pub fn min_premarket_percent_change(&self) -> PercentChange {
        self.min_premarket_percent_change
    }

    pub fn liquidation_lead(&self) -> time::Duration {
        self.liquidation_lead
    }

    pub fn subscribe_retry_interval(&self) -> time::Duration {
        self.subscribe_retry_interval
    }

    pub fn subscribe_max_wait(&self) -> time::Duration {
        self.subscribe_max_wait
    }
}

impl From<&BotConfig> for BotProcessConfig {
    fn from(value: &BotConfig) -> Self {
        Self {
            min_premarket_percent_change: value.min_premarket_percent_change(),
            liquidation_lead: value.liquidation_lead(),
            subscribe_retry_interval: value.subscribe_retry_interval(),
            subscribe_max_wait: value.subscribe_max_wait(),
        }
    }
}

#[derive(Clone, Debug)]
pub(super) struct BotControllerConfig {
    shutdown_timeout: time::Duration,
}

impl BotControllerConfig {
    pub fn shutdown_timeout(&self) -> time::Duration {
        self.shutdown_timeout
    }
}

impl From<&BotConfig> for BotControllerConfig {
    fn from(value: &BotConfig) -> Self {
        Self {
            shutdown_timeout: value.shutdown_timeout(),
        }
    }
}
