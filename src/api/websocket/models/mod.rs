use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::error::{Result, WebSocketApiError};


/// A single trade print delivered by the market data stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradeTick {
    #[serde(rename = "S")]
    symbol: String,
    #[serde(rename = "i")]
    id: u64,
    #[serde(rename = "x")]
    exchange: String,
    #[serde(rename = "p")]
    price: f64,
    #[serde(rename = "s")]
    size: f64,
    #[serde(rename = "t")]
    time: DateTime<Utc>,
    #[serde(rename = "c", default)]
    conditions: Vec<String>,
    #[serde(rename = "z", default)]
    tape: String,
}

impl TradeTick {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    pub fn tape(&self) -> &str {
        &self.tape
    }
}

impl fmt::Display for TradeTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "symbol={} id={} exchange={} price={} size={} time={} conditions={:?} tape={}",
            self.symbol,
            self.id,
            self.exchange,
            self.price,
            self.size,
            self.time.to_rfc3339(),
            self.conditions,
            self.tape
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "T")]
pub(crate) enum DataStreamMessage {
    #[serde(rename = "success")]
    Success { msg: String },

    #[serde(rename = "error")]
    Error { code: u16, msg: String },

    #[serde(rename = "subscription")]
    Subscription {
        #[serde(default)]
        trades: Vec<String>,
    },

    #[serde(rename = "t")]
    Trade(TradeTick),

    // Quotes, bars and statuses are never subscribed to
    #[serde(other)]
    Other,
}

impl DataStreamMessage {
    /// Data stream frames carry a JSON array of messages.
    pub fn parse_batch(text: &str) -> Result<Vec<Self>> {
        serde_json::from_str(text).map_err(WebSocketApiError::DecodeJson)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub(crate) enum DataStreamRequest<'a> {
    Auth { key: &'a str, secret: &'a str },
    Subscribe { trades: Vec<String> },
    Unsubscribe { trades: Vec<String> },
}

impl DataStreamRequest<'_> {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(WebSocketApiError::EncodeJson)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// The order carried by a trade update event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderUpdate {
    id: Uuid,
    symbol: String,
    side: OrderSide,
    qty: Option<String>,
    filled_qty: String,
}

impl OrderUpdate {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    /// Ordered quantity. `None` for notional orders.
    pub fn qty(&self) -> Option<&str> {
        self.qty.as_deref()
    }

    pub fn filled_qty(&self) -> &str {
        &self.filled_qty
    }
}

/// An order lifecycle event (`new`, `fill`, `partial_fill`, `canceled`, ...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradeUpdate {
    event: String,
    order: OrderUpdate,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

impl TradeUpdate {
    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn order(&self) -> &OrderUpdate {
        &self.order
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TradingStreamMessage {
    Authorization { authorized: bool },
    Listening { streams: Vec<String> },
    TradeUpdate(TradeUpdate),
    Other(String),
}

#[derive(Deserialize)]
struct RawTradingStreamMessage {
    stream: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct AuthorizationData {
    status: String,
}

#[derive(Deserialize)]
struct ListeningData {
    #[serde(default)]
    streams: Vec<String>,
}

impl TradingStreamMessage {
    pub fn parse(text: &str) -> Result<Self> {
        let raw: RawTradingStreamMessage =
            serde_json::from_str(text).map_err(WebSocketApiError::DecodeJson)?;

        let message = match raw.stream.as_str() {
            "authorization" => {
                let data: AuthorizationData =
                    serde_json::from_value(raw.data).map_err(WebSocketApiError::DecodeJson)?;
                Self::Authorization {
                    authorized: data.status == "authorized",
                }
            }
            "listening" => {
                let data: ListeningData =
                    serde_json::from_value(raw.data).map_err(WebSocketApiError::DecodeJson)?;
                Self::Listening {
                    streams: data.streams,
                }
            }
            "trade_updates" => Self::TradeUpdate(
                serde_json::from_value(raw.data).map_err(WebSocketApiError::DecodeJson)?,
            ),
            _ => Self::Other(raw.stream),
        };

        Ok(message)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub(crate) enum TradingStreamRequest<'a> {
    Auth { key: &'a str, secret: &'a str },
    Listen { data: ListenStreams },
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ListenStreams {
    pub streams: Vec<&'static str>,
}

impl TradingStreamRequest<'_> {
    pub fn listen_trade_updates() -> Self {
        Self::Listen {
            data: ListenStreams {
                streams: vec!["trade_updates"],
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(WebSocketApiError::EncodeJson)
    }
}
