mod base;
mod market_data;
mod trading;

pub(crate) use base::{AlpacaRestBase, LIVE_TRADING_DOMAIN, MARKET_DATA_DOMAIN, PAPER_TRADING_DOMAIN};
pub(crate) use market_data::AlpacaMarketDataRepository;
pub(crate) use trading::AlpacaTradingRepository;
