use std::sync::{Arc, Mutex};

use tokio::{
    sync::broadcast::{self, error::RecvError},
    time,
};

use crate::{
    api::{
        ApiClientConfig, Credentials, DataStreamClient, MarketDataClient, RestClient,
        StockDataStream, TradeHandler, TradeUpdateClient, TradeUpdateHandler, TradingClient,
        TradingStream,
    },
    util::AbortOnDropHandle,
};

use super::{
    clock::{Clock, SystemClock},
    config::{BotConfig, BotControllerConfig},
    error::{BotError, Result},
    handlers::LoggingTradeUpdateHandler,
    process::{BotProcess, CycleParts, Transport, error::BotProcessError},
    state::{BotReceiver, BotStatus, BotStatusManager, BotTransmitter, BotUpdate, ExitFlag},
};

/// Controller for managing and monitoring a running [`TradingBot`]. Provides an interface to
/// request exit, monitor status, receive updates, and perform shutdown operations.
pub struct TradingBotController {
    config: BotControllerConfig,
    process_handle: Mutex<Option<AbortOnDropHandle<()>>>,
    exit: Arc<ExitFlag>,
    status_manager: Arc<BotStatusManager>,
}

impl TradingBotController {
    fn new(
        config: &BotConfig,
        process_handle: AbortOnDropHandle<()>,
        exit: Arc<ExitFlag>,
        status_manager: Arc<BotStatusManager>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: config.into(),
            process_handle: Mutex::new(Some(process_handle)),
            exit,
            status_manager,
        })
    }

    /// Creates a new [`BotReceiver`] for subscribing to status changes and cycle updates.
    pub fn update_receiver(&self) -> BotReceiver {
        self.status_manager.update_receiver()
    }

    /// Returns the current [`BotStatus`] as a snapshot.
    pub fn status_snapshot(&self) -> BotStatus {
        self.status_manager.status_snapshot()
    }

    /// Asks the trading cycle to stop. The request is observed at the top of the next iteration,
    /// or right away while the cycle idles between sessions. Positions are liquidated as usual
    /// if the request arrives while waiting for the session close.
    pub fn request_exit(&self) {
        tracing::info!("exit requested");
        self.exit.request();
    }

    /// Waits until the bot stops, returning the final [`BotStatus`] (either
    /// [`BotStatus::Shutdown`] or [`BotStatus::Terminated`]).
    pub async fn until_stopped(&self) -> BotStatus {
        let mut update_rx = self.update_receiver();

        loop {
            let status = self.status_snapshot();
            if status.is_stopped() {
                return status;
            }

            match update_rx.recv().await {
                Ok(BotUpdate::Status(status)) if status.is_stopped() => return status,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return self.status_snapshot(),
            }
        }
    }

    fn try_consume_handle(&self) -> Option<AbortOnDropHandle<()>> {
        self.process_handle
            .lock()
            .expect("`TradingBotController` mutex can't be poisoned")
            .take()
    }

    /// Requests exit and waits for the bot to stop. If it does not stop within the configured
    /// shutdown timeout, the bot is aborted.
    ///
    /// This method can only be called once per controller instance.
    ///
    /// Returns an error if the bot had to be aborted, if it terminated with an error, or if the
    /// handle was already consumed.
    pub async fn shutdown(&self) -> Result<()> {
        let Some(mut handle) = self.try_consume_handle() else {
            return Err(BotError::AlreadyShutdown);
        };

        let status = self.status_manager.status_snapshot();
        if handle.is_finished() || status.is_stopped() {
            return Err(BotError::AlreadyTerminated(status));
        }

        self.status_manager.update(BotStatus::ShutdownInitiated);
        self.exit.request();

        let shutdown_res = tokio::select! {
            join_res = &mut handle => join_res.map_err(BotProcessError::ProcessTaskJoin),
            _ = time::sleep(self.config.shutdown_timeout()) => {
                handle.abort();
                Err(BotProcessError::ShutdownTimeout)
            }
        };

        if let Err(e) = shutdown_res {
            let e_ref = Arc::new(e);
            self.status_manager.update(e_ref.clone().into());

            return Err(BotError::ShutdownFailed(e_ref));
        }

        match self.status_manager.status_snapshot() {
            BotStatus::Terminated(e) => Err(BotError::ShutdownFailed(e)),
            _ => Ok(()),
        }
    }

    /// Aborts the bot immediately, without waiting for the cycle to observe the exit request.
    pub fn abort(&self) {
        let Some(handle) = self.try_consume_handle() else {
            return;
        };

        if handle.is_finished() {
            return;
        }

        handle.abort();
        self.status_manager.update(BotProcessError::Aborted.into());
    }
}

/// Builder for configuring and starting the trading bot. Holds the configuration and the broker
/// and stream clients. The transport and the trading cycle are started when
/// [`start`](Self::start) is called, returning a [`TradingBotController`].
pub struct TradingBot {
    config: BotConfig,
    trading: TradingClient,
    market_data: MarketDataClient,
    data_stream: DataStreamClient,
    trade_updates: TradeUpdateClient,
    tick_handler: Option<Arc<dyn TradeHandler>>,
    trade_update_handler: Arc<dyn TradeUpdateHandler>,
    clock: Arc<dyn Clock>,
    status_manager: Arc<BotStatusManager>,
    update_tx: BotTransmitter,
}

impl TradingBot {
    /// Creates a bot from arbitrary broker and stream clients.
    pub fn new(
        config: BotConfig,
        trading: TradingClient,
        market_data: MarketDataClient,
        data_stream: DataStreamClient,
        trade_updates: TradeUpdateClient,
    ) -> Self {
        let (update_tx, _) = broadcast::channel::<BotUpdate>(1_000);

        let status_manager = BotStatusManager::new(update_tx.clone());

        Self {
            config,
            trading,
            market_data,
            data_stream,
            trade_updates,
            tick_handler: None,
            trade_update_handler: Arc::new(LoggingTradeUpdateHandler),
            clock: Arc::new(SystemClock),
            status_manager,
            update_tx,
        }
    }

    /// Creates a bot backed by the Alpaca REST and streaming APIs.
    pub fn with_alpaca(config: BotConfig, credentials: Credentials) -> Result<Self> {
        let api_config = ApiClientConfig::from(&config);

        let rest = RestClient::new(&api_config, &credentials).map_err(BotError::RestApiInit)?;
        let data_stream = StockDataStream::new(&api_config, credentials.clone());
        let trade_updates = TradingStream::new(&api_config, credentials);

        Ok(Self::new(
            config,
            rest.trading,
            rest.market_data,
            data_stream,
            trade_updates,
        ))
    }

    /// Replaces the default trade handler, which logs prints and reports threshold crossings.
    pub fn with_tick_handler(mut self, handler: Arc<dyn TradeHandler>) -> Self {
        self.tick_handler = Some(handler);
        self
    }

    /// Replaces the default trade update handler, which logs order events.
    pub fn with_trade_update_handler(mut self, handler: Arc<dyn TradeUpdateHandler>) -> Self {
        self.trade_update_handler = handler;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates a new [`BotReceiver`] for subscribing to status changes and cycle updates.
    pub fn update_receiver(&self) -> BotReceiver {
        self.status_manager.update_receiver()
    }

    /// Returns the current [`BotStatus`] as a snapshot.
    pub fn status_snapshot(&self) -> BotStatus {
        self.status_manager.status_snapshot()
    }

    /// Starts the transport and the trading cycle and returns a [`TradingBotController`] for
    /// managing them. Must be called within a tokio runtime.
    pub fn start(self) -> Arc<TradingBotController> {
        let exit = ExitFlag::new();

        let transport = Transport::new(
            self.data_stream.clone(),
            self.trade_updates,
            self.trade_update_handler,
        );

        let parts = CycleParts {
            trading: self.trading,
            market_data: self.market_data,
            data_stream: self.data_stream,
            tick_handler: self.tick_handler,
            clock: self.clock,
        };

        let process = BotProcess::new(
            &self.config,
            parts,
            exit.clone(),
            self.status_manager.clone(),
            self.update_tx,
        );

        let process_handle = process.spawn(transport);

        TradingBotController::new(&self.config, process_handle, exit, self.status_manager)
    }
}
