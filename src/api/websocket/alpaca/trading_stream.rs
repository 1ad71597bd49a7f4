use std::sync::Arc;

use async_trait::async_trait;
use tokio::time;

use crate::{
    api::config::{ApiClientConfig, Credentials},
    util::Never,
};

use super::{
    super::{
        backoff::ReconnectBackoff,
        error::{Result, WebSocketApiError},
        models::{TradingStreamMessage, TradingStreamRequest},
        repositories::{TradeUpdateHandler, TradeUpdateRepository},
        state::{WsConnectionStatus, WsConnectionStatusManager},
    },
    StreamConfig,
    connection::{Heartbeat, WebSocketApiConnection, WsMessage},
};

pub(crate) const PAPER_TRADING_STREAM_DOMAIN: &str = "paper-api.alpaca.markets";
pub(crate) const LIVE_TRADING_STREAM_DOMAIN: &str = "api.alpaca.markets";
const TRADING_STREAM_PATH: &str = "/stream";

/// Order lifecycle events over the trading websocket.
pub struct TradingStream {
    config: StreamConfig,
    domain: &'static str,
    credentials: Credentials,
    status_manager: Arc<WsConnectionStatusManager>,
}

impl TradingStream {
    pub fn new(config: &ApiClientConfig, credentials: Credentials) -> Arc<Self> {
        let config = StreamConfig::from(config);
        let domain = if config.paper() {
            PAPER_TRADING_STREAM_DOMAIN
        } else {
            LIVE_TRADING_STREAM_DOMAIN
        };

        Arc::new(Self {
            config,
            domain,
            credentials,
            status_manager: WsConnectionStatusManager::new(),
        })
    }

    async fn authenticate(&self, ws: &mut WebSocketApiConnection) -> Result<()> {
        let timeout = self.config.heartbeat_interval() * 2;

        let auth = TradingStreamRequest::Auth {
            key: self.credentials.key(),
            secret: self.credentials.secret(),
        };
        ws.send_text(auth.to_json()?).await?;

        loop {
            let text = ws.read_text(timeout).await?;

            if let TradingStreamMessage::Authorization { authorized } =
                TradingStreamMessage::parse(&text)?
            {
                if !authorized {
                    return Err(WebSocketApiError::AuthenticationFailed {
                        code: None,
                        msg: "trading stream authorization rejected".to_string(),
                    });
                }
                break;
            }
        }

        ws.send_text(TradingStreamRequest::listen_trade_updates().to_json()?)
            .await?;

        loop {
            let text = ws.read_text(timeout).await?;

            if let TradingStreamMessage::Listening { streams } = TradingStreamMessage::parse(&text)?
            {
                tracing::debug!(?streams, "trading stream listening");
                return Ok(());
            }
        }
    }

    async fn run_connection(
        &self,
        handler: &Arc<dyn TradeUpdateHandler>,
        backoff: &mut ReconnectBackoff,
    ) -> Result<Never> {
        let mut ws = WebSocketApiConnection::new(self.domain, TRADING_STREAM_PATH).await?;

        self.authenticate(&mut ws).await?;

        self.status_manager.update(WsConnectionStatus::Connected);
        backoff.reset();
        tracing::info!("trading stream connected");

        let mut heartbeat = Heartbeat::new(self.config.heartbeat_interval());

        loop {
            tokio::select! {
                read_result = ws.read_message() => {
                    heartbeat.reset();

                    match read_result? {
                        WsMessage::Text(text) => match TradingStreamMessage::parse(&text)? {
                            TradingStreamMessage::TradeUpdate(update) => {
                                handler.on_trade_update(update).await;
                            }
                            TradingStreamMessage::Authorization { authorized: false } => {
                                return Err(WebSocketApiError::AuthenticationFailed {
                                    code: None,
                                    msg: "trading stream authorization revoked".to_string(),
                                });
                            }
                            other => tracing::trace!(?other, "ignored trading stream message"),
                        },
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
impl TradeUpdateRepository for TradingStream {
    fn connection_status(&self) -> Arc<WsConnectionStatus> {
        self.status_manager.snapshot()
    }

    async fn run_forever(&self, handler: Arc<dyn TradeUpdateHandler>) -> Result<Never> {
        let mut backoff = ReconnectBackoff::new(
            self.config.reconnect_min_backoff(),
            self.config.reconnect_max_backoff(),
        );

        loop {
            self.status_manager.update(WsConnectionStatus::Connecting);

            let err = match self.run_connection(&handler, &mut backoff).await {
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
                "trading stream {}, reconnecting in {}s",
                self.connection_status(),
                delay.as_secs()
            );

            time::sleep(delay).await;
        }
    }
}
