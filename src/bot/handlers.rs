use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::api::{TradeHandler, TradeTick, TradeUpdate, TradeUpdateHandler};

/// Logs every trade print and flags prints at or above the symbol's threshold price.
///
/// Crossing a threshold is only reported. No order is placed.
#[derive(Debug, Default)]
pub struct LoggingTradeHandler {
    thresholds: BTreeMap<String, f64>,
}

impl LoggingTradeHandler {
    pub fn new(thresholds: BTreeMap<String, f64>) -> Self {
        Self { thresholds }
    }

    /// Returns the threshold price crossed by `tick`, if any.
    pub fn crossed_threshold(&self, tick: &TradeTick) -> Option<f64> {
        self.thresholds
            .get(tick.symbol())
            .copied()
            .filter(|threshold| tick.price() >= *threshold)
    }
}

#[async_trait]
impl TradeHandler for LoggingTradeHandler {
    async fn on_trade(&self, tick: TradeTick) {
        tracing::info!("Data: {tick}");

        if let Some(threshold) = self.crossed_threshold(&tick) {
            tracing::info!(
                symbol = tick.symbol(),
                price = tick.price(),
                threshold,
                "premarket threshold crossed"
            );
        }
    }
}

/// Logs order lifecycle events.
#[derive(Debug, Default)]
pub struct LoggingTradeUpdateHandler;

#[async_trait]
impl TradeUpdateHandler for LoggingTradeUpdateHandler {
    async fn on_trade_update(&self, update: TradeUpdate) {
        let order = update.order();

        tracing::info!(
            event = update.event(),
            symbol = order.symbol(),
            side = %order.side(),
            qty = order.qty().unwrap_or("-"),
            filled_qty = order.filled_qty(),
            "trade update"
        );
    }
}
