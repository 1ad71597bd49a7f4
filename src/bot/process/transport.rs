use std::sync::Arc;

use crate::{
    api::{DataStreamClient, TradeUpdateClient, TradeUpdateHandler},
    util::AbortOnDropHandle,
};

use super::error::BotProcessError;

/// The two perpetual stream loops, driven together on one task.
pub(in crate::bot) struct Transport {
    data_stream: DataStreamClient,
    trade_updates: TradeUpdateClient,
    trade_update_handler: Arc<dyn TradeUpdateHandler>,
}

impl Transport {
    pub fn new(
        data_stream: DataStreamClient,
        trade_updates: TradeUpdateClient,
        trade_update_handler: Arc<dyn TradeUpdateHandler>,
    ) -> Self {
        Self {
            data_stream,
            trade_updates,
            trade_update_handler,
        }
    }

    /// Spawns the stream loops. The task only completes when either loop hits a
    /// non-recoverable error.
    pub fn spawn(self) -> AbortOnDropHandle<BotProcessError> {
        tokio::spawn(async move {
            let e = tokio::select! {
                res = self.data_stream.run_forever() => match res {
                    Ok(never) => match never {},
                    Err(e) => e,
                },
                res = self.trade_updates.run_forever(self.trade_update_handler.clone()) => {
                    match res {
                        Ok(never) => match never {},
                        Err(e) => e,
                    }
                }
            };

            tracing::error!("stream transport terminated: {e}");

            BotProcessError::Transport(e)
        })
        .into()
    }
}
