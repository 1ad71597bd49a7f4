use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;

use crate::util::Never;

use super::{
    error::Result,
    models::{TradeTick, TradeUpdate},
    state::WsConnectionStatus,
};

/// Receives the trade prints of the subscribed symbols.
///
/// Called from the stream loop, prints of one symbol arrive in order.
#[async_trait]
pub trait TradeHandler: Send + Sync {
    async fn on_trade(&self, tick: TradeTick);
}

/// Receives order lifecycle events.
#[async_trait]
pub trait TradeUpdateHandler: Send + Sync {
    async fn on_trade_update(&self, update: TradeUpdate);
}

/// Live trade feed with an auto-reconnecting connection.
#[async_trait]
pub trait DataStreamRepository: Send + Sync {
    fn connection_status(&self) -> Arc<WsConnectionStatus>;

    fn is_connected(&self) -> bool;

    /// Registers `handler` for `symbols` and requests their trades.
    ///
    /// Fails with [`WebSocketApiError::NotConnected`] while the stream is not connected.
    ///
    /// [`WebSocketApiError::NotConnected`]: super::error::WebSocketApiError::NotConnected
    async fn subscribe_trades(
        &self,
        symbols: &BTreeSet<String>,
        handler: Arc<dyn TradeHandler>,
    ) -> Result<()>;

    /// Deregisters `symbols`. Trades already in flight for them are dropped.
    async fn unsubscribe_trades(&self, symbols: &BTreeSet<String>) -> Result<()>;

    fn subscribed_symbols(&self) -> BTreeSet<String>;

    /// Drives the connection until a non-recoverable error occurs.
    async fn run_forever(&self) -> Result<Never>;
}

/// Order lifecycle feed with an auto-reconnecting connection.
#[async_trait]
pub trait TradeUpdateRepository: Send + Sync {
    fn connection_status(&self) -> Arc<WsConnectionStatus>;

    /// Drives the connection, forwarding every trade update to `handler`, until a
    /// non-recoverable error occurs.
    async fn run_forever(&self, handler: Arc<dyn TradeUpdateHandler>) -> Result<Never>;
}
