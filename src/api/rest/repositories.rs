use async_trait::async_trait;
use chrono::NaiveDate;

use super::{
    error::Result,
    models::{Asset, AssetFilter, BarsRequest, CalendarDay, ClosePositionResult, RawBar},
};

/// Trading account operations consumed by the bot.
#[async_trait]
pub trait TradingRepository: Send + Sync {
    /// Lists the assets matching `filter`. Callers decide what to do with non-tradable assets.
    async fn tradable_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>>;

    /// Returns the trading calendar between `start` and `end` (inclusive), ordered by date.
    ///
    /// Non-trading days have no entry.
    async fn calendar(&self, start: Option<NaiveDate>, end: NaiveDate) -> Result<Vec<CalendarDay>>;

    /// Liquidates every open position, cancelling open orders first if `cancel_orders` is set.
    async fn close_all_positions(&self, cancel_orders: bool) -> Result<Vec<ClosePositionResult>>;
}

/// Historical market data consumed by the scanner.
#[async_trait]
pub trait MarketDataRepository: Send + Sync {
    /// Fetches every bar matching `request`, following pagination until exhausted.
    async fn bars(&self, request: &BarsRequest) -> Result<Vec<RawBar>>;
}
