use std::time::Duration;

use super::super::{config::ApiClientConfig, rest::models::DataFeed};

mod connection;
mod data_stream;
mod trading_stream;

pub use data_stream::StockDataStream;
pub use trading_stream::TradingStream;

#[derive(Clone, Debug)]
pub(crate) struct StreamConfig {
    paper: bool,
    data_feed: DataFeed,
    heartbeat_interval: Duration,
    reconnect_min_backoff: Duration,
    reconnect_max_backoff: Duration,
}

impl From<&ApiClientConfig> for StreamConfig {
    fn from(value: &ApiClientConfig) -> Self {
        Self {
            paper: value.paper(),
            data_feed: value.data_feed(),
            heartbeat_interval: value.ws_heartbeat_interval(),
            reconnect_min_backoff: value.ws_reconnect_min_backoff(),
            reconnect_max_backoff: value.ws_reconnect_max_backoff(),
        }
    }
}

impl StreamConfig {
    pub fn paper(&self) -> bool {
        self.paper
    }

    pub fn data_feed(&self) -> DataFeed {
        self.data_feed
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    pub fn reconnect_min_backoff(&self) -> Duration {
        self.reconnect_min_backoff
    }

    pub fn reconnect_max_backoff(&self) -> Duration {
        self.reconnect_max_backoff
    }
}
