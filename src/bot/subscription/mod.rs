use std::{collections::BTreeSet, sync::Arc};

use crate::api::{DataStreamClient, TradeHandler};

pub(crate) mod error;

use error::{Result, SubscriptionError};


/// Maps the active symbol set to trade subscriptions on the live data stream.
///
/// Connection failures are handled by the stream's own reconnect loop. Calls made while the
/// stream is disconnected fail with [`SubscriptionError::NotConnected`] and may be retried.
pub struct SubscriptionManager {
    stream: DataStreamClient,
    active: BTreeSet<String>,
}

impl SubscriptionManager {
    pub fn new(stream: DataStreamClient) -> Self {
        Self {
            stream,
            active: BTreeSet::new(),
        }
    }

    pub fn active(&self) -> &BTreeSet<String> {
        &self.active
    }

    /// Requests trades for `symbols`, delivered to `handler`. An empty set is a no-op.
    pub async fn subscribe(
        &mut self,
        symbols: &BTreeSet<String>,
        handler: Arc<dyn TradeHandler>,
    ) -> Result<()> {
        if symbols.is_empty() {
            return Ok(());
        }

        if !self.stream.is_connected() {
            return Err(SubscriptionError::NotConnected(
                self.stream.connection_status(),
            ));
        }

        self.stream.subscribe_trades(symbols, handler).await?;
        self.active.extend(symbols.iter().cloned());

        tracing::info!(symbols = symbols.len(), "subscribed to trades");

        Ok(())
    }

    /// Stops trades for `symbols`. An empty set is a no-op.
    pub async fn unsubscribe(&mut self, symbols: &BTreeSet<String>) -> Result<()> {
        if symbols.is_empty() {
            return Ok(());
        }

        self.stream.unsubscribe_trades(symbols).await?;
        self.active.retain(|symbol| !symbols.contains(symbol));

        tracing::info!(symbols = symbols.len(), "unsubscribed from trades");

        Ok(())
    }
}
