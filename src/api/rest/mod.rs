use std::sync::Arc;

pub(crate) mod alpaca;
pub(crate) mod error;
pub(crate) mod models;
pub(crate) mod repositories;

use alpaca::{
    AlpacaMarketDataRepository, AlpacaRestBase, AlpacaTradingRepository, LIVE_TRADING_DOMAIN,
    MARKET_DATA_DOMAIN, PAPER_TRADING_DOMAIN,
};
use error::Result;
use repositories::{MarketDataRepository, TradingRepository};

use super::config::{ApiClientConfig, Credentials};

pub type TradingClient = Arc<dyn TradingRepository>;
pub type MarketDataClient = Arc<dyn MarketDataRepository>;

/// Client for the [Alpaca v2] REST APIs.
///
/// [Alpaca v2]: https://docs.alpaca.markets/reference
pub struct RestClient {
    /// Trading API: assets, calendar and positions. Targets the paper environment unless
    /// configured otherwise.
    pub trading: TradingClient,

    /// Market data API: historical stock bars.
    pub market_data: MarketDataClient,
}

impl RestClient {
    pub fn new(config: &ApiClientConfig, credentials: &Credentials) -> Result<Self> {
        let trading_domain = if config.paper() {
            PAPER_TRADING_DOMAIN
        } else {
            LIVE_TRADING_DOMAIN
        };

        let trading_base = AlpacaRestBase::new(config.rest_timeout(), trading_domain, credentials)?;
        let data_base =
            AlpacaRestBase::new(config.rest_timeout(), MARKET_DATA_DOMAIN, credentials)?;

        let trading = Arc::new(AlpacaTradingRepository::new(trading_base));
        let market_data = Arc::new(AlpacaMarketDataRepository::new(
            data_base,
            config.bars_symbols_per_request(),
        ));

        Ok(Self {
            trading,
            market_data,
        })
    }
}
