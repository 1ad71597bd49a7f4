use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use tokio::{
    sync::{Mutex as AsyncMutex, mpsc},
    time,
};

use crate::{
    api::config::{ApiClientConfig, Credentials},
    util::Never,
};

use super::{
    super::{
        backoff::ReconnectBackoff,
        error::{Result, WebSocketApiError},
        models::{DataStreamMessage, DataStreamRequest, TradeTick},
        repositories::{DataStreamRepository, TradeHandler},
        state::{WsConnectionStatus, WsConnectionStatusManager},
    },
    StreamConfig,
    connection::{Heartbeat, WebSocketApiConnection, WsMessage},
};

pub(crate) const DATA_STREAM_DOMAIN: &str = "stream.data.alpaca.markets";

#[derive(Debug)]
enum StreamCommand {
    Subscribe(Vec<String>),
    Unsubscribe(Vec<String>),
}

type HandlerMap = HashMap<String, Arc<dyn TradeHandler>>;

/// Live stock trades over the market data websocket.
///
/// Subscriptions are tracked locally and replayed after every reconnect. Prints are dispatched
/// to the handler registered for their symbol from within [`run_forever`], so a slow handler
/// delays the next print.
///
/// [`run_forever`]: DataStreamRepository::run_forever
pub struct StockDataStream {
    config: StreamConfig,
    path: String,
    credentials: Credentials,
    status_manager: Arc<WsConnectionStatusManager>,
    handlers: Mutex<HandlerMap>,
    command_tx: mpsc::UnboundedSender<StreamCommand>,
    command_rx: AsyncMutex<mpsc::UnboundedReceiver<StreamCommand>>,
}

impl StockDataStream {
    pub fn new(config: &ApiClientConfig, credentials: Credentials) -> Arc<Self> {
        let config = StreamConfig::from(config);
        let path = format!("/v2/{}", config.data_feed());
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            config,
            path,
            credentials,
            status_manager: WsConnectionStatusManager::new(),
            handlers: Mutex::new(HashMap::new()),
            command_tx,
            command_rx: AsyncMutex::new(command_rx),
        })
    }

    fn lock_handlers(&self) -> MutexGuard<'_, HandlerMap> {
        self.handlers
            .lock()
            .expect("`StockDataStream` handlers mutex can't be poisoned")
    }

    fn handler_for(&self, symbol: &str) -> Option<Arc<dyn TradeHandler>> {
        self.lock_handlers().get(symbol).cloned()
    }

    async fn authenticate(&self, ws: &mut WebSocketApiConnection) -> Result<()> {
        let auth = DataStreamRequest::Auth {
            key: self.credentials.key(),
            secret: self.credentials.secret(),
        };
        ws.send_text(auth.to_json()?).await?;

        let timeout = self.config.heartbeat_interval() * 2;

        loop {
            let text = ws.read_text(timeout).await?;

            for message in DataStreamMessage::parse_batch(&text)? {
                match message {
                    DataStreamMessage::Success { msg } if msg == "authenticated" => return Ok(()),
                    DataStreamMessage::Error { code, msg } => {
                        return Err(WebSocketApiError::AuthenticationFailed {
                            code: Some(code),
                            msg,
                        });
                    }
                    // "connected" welcome message
                    _ => {}
                }
            }
        }
    }

    async fn dispatch_trade(&self, tick: TradeTick) {
        match self.handler_for(tick.symbol()) {
            Some(handler) => handler.on_trade(tick).await,
            None => tracing::trace!(symbol = tick.symbol(), "trade for unregistered symbol"),
        }
    }

    async fn handle_text(&self, text: &str) -> Result<()> {
        for message in DataStreamMessage::parse_batch(text)? {
            match message {
                DataStreamMessage::Trade(tick) => self.dispatch_trade(tick).await,
                DataStreamMessage::Subscription { trades } => {
                    tracing::debug!(trades = trades.len(), "trade subscriptions updated");
                }
                DataStreamMessage::Error { code, msg } => {
                    let err = WebSocketApiError::StreamError { code, msg };
                    if err.is_fatal() {
                        return Err(err);
                    }
                    tracing::warn!("market data stream error: {err}");
                }
                DataStreamMessage::Success { .. } | DataStreamMessage::Other => {}
            }
        }

        Ok(())
    }

    async fn run_connection(
        &self,
        command_rx: &mut mpsc::UnboundedReceiver<StreamCommand>,
        backoff: &mut ReconnectBackoff,
    ) -> Result<Never> {
        let mut ws = WebSocketApiConnection::new(DATA_STREAM_DOMAIN, &self.path).await?;

        self.authenticate(&mut ws).await?;

        self.status_manager.update(WsConnectionStatus::Connected);
        backoff.reset();
        tracing::info!("market data stream connected");

        let registered = self.subscribed_symbols();
        if !registered.is_empty() {
            let resubscribe = DataStreamRequest::Subscribe {
                trades: registered.into_iter().collect(),
            };
            ws.send_text(resubscribe.to_json()?).await?;
        }

        let mut heartbeat = Heartbeat::new(self.config.heartbeat_interval());

        loop {
            tokio::select! {
                Some(command) = command_rx.recv() => {
                    let request = match command {
                        StreamCommand::Subscribe(trades) => DataStreamRequest::Subscribe { trades },
                        StreamCommand::Unsubscribe(trades) => DataStreamRequest::Unsubscribe { trades },
                    };
                    ws.send_text(request.to_json()?).await?;
                }
                read_result = ws.read_message() => {
                    heartbeat.reset();

                    match read_result? {
                        WsMessage::Text(text) => self.handle_text(&text).await?,
                        WsMessage::Ping(payload) => ws.send_pong(payload).await?,
                        WsMessage::Pong => {}
                        WsMessage::Close => {
                            let _ = ws.send_close().await;
                            return Err(WebSocketApiError::ServerRequestedClose);
                        }
                    }
                }
                _ = heartbeat.expired() => {
                    heartbeat.on_expired(&mut ws).await?;
                }
            }
        }
    }
}

#[async_trait]
impl DataStreamRepository for StockDataStream {
    fn connection_status(&self) -> Arc<WsConnectionStatus> {
        self.status_manager.snapshot()
    }

    fn is_connected(&self) -> bool {
        self.status_manager.is_connected()
    }

    async fn subscribe_trades(
        &self,
        symbols: &BTreeSet<String>,
        handler: Arc<dyn TradeHandler>,
    ) -> Result<()> {
        if symbols.is_empty() {
            return Ok(());
        }

        if !self.is_connected() {
            return Err(WebSocketApiError::NotConnected(self.connection_status()));
        }

        {
            let mut handlers = self.lock_handlers();
            for symbol in symbols {
                handlers.insert(symbol.clone(), handler.clone());
            }
        }

        // The receiver lives as long as `self`
        let _ = self
            .command_tx
            .send(StreamCommand::Subscribe(symbols.iter().cloned().collect()));

        Ok(())
    }

    async fn unsubscribe_trades(&self, symbols: &BTreeSet<String>) -> Result<()> {
        if symbols.is_empty() {
            return Ok(());
        }

        {
            let mut handlers = self.lock_handlers();
            for symbol in symbols {
                handlers.remove(symbol);
            }
        }

        // Dropped registrations are not replayed after a reconnect, so queueing while
        // disconnected is harmless
        let _ = self
            .command_tx
            .send(StreamCommand::Unsubscribe(symbols.iter().cloned().collect()));

        Ok(())
    }

    fn subscribed_symbols(&self) -> BTreeSet<String> {
        self.lock_handlers().keys().cloned().collect()
    }

    async fn run_forever(&self) -> Result<Never> {
        let mut command_rx = self
            .command_rx
            .try_lock()
            .map_err(|_| WebSocketApiError::AlreadyRunning)?;

        let mut backoff = ReconnectBackoff::new(
            self.config.reconnect_min_backoff(),
            self.config.reconnect_max_backoff(),
        );

        loop {
            self.status_manager.update(WsConnectionStatus::Connecting);

            let err = match self.run_connection(&mut command_rx, &mut backoff).await {
                Ok(never) => match never {},
                Err(err) => err,
            };

            let is_fatal = err.is_fatal();
            self.status_manager.update(WsConnectionStatus::Failed(err));

            if is_fatal {
                return Err(WebSocketApiError::Terminated(self.connection_status()));
            }

            let delay = backoff.next_delay();
            tracing::warn!(
                "market data stream {}, reconnecting in {}s",
                self.connection_status(),
                delay.as_secs()
            );

            time::sleep(delay).await;
        }
    }
}
