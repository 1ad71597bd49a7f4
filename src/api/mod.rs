pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod rest;
pub(crate) mod websocket;

pub use config::{ApiClientConfig, Credentials};
pub use rest::{
    MarketDataClient, RestClient, TradingClient,
    models::{
        Adjustment, Asset, AssetClass, AssetExchange, AssetFilter, AssetStatus, BarsRequest,
        CalendarDay, ClosePositionResult, DataFeed, RawBar,
    },
    repositories::{MarketDataRepository, TradingRepository},
};
pub use websocket::{
    DataStreamClient, TradeUpdateClient,
    alpaca::{StockDataStream, TradingStream},
    models::{OrderSide, OrderUpdate, TradeTick, TradeUpdate},
    repositories::{DataStreamRepository, TradeHandler, TradeUpdateHandler, TradeUpdateRepository},
    state::WsConnectionStatus,
};
