use std::{collections::HashMap, fmt};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::util;

mod serde_util;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    UsEquity,
    UsOption,
    Crypto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum AssetExchange {
    Amex,
    Arca,
    Bats,
    Nyse,
    Nasdaq,
    Nysearca,
    Otc,
}

/// Server-side filter for asset listings.
///
/// The default selects active US equities listed on NASDAQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetFilter {
    pub status: AssetStatus,
    pub asset_class: AssetClass,
    pub exchange: AssetExchange,
}

impl Default for AssetFilter {
    fn default() -> Self {
        Self {
            status: AssetStatus::Active,
            asset_class: AssetClass::UsEquity,
            exchange: AssetExchange::Nasdaq,
        }
    }
}

impl AssetFilter {
    pub(crate) fn query_params(&self) -> [(&'static str, String); 3] {
        [
            ("status", self.status.to_string()),
            ("asset_class", self.asset_class.to_string()),
            ("exchange", self.exchange.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    id: Uuid,
    symbol: String,
    // Kept as text, the exchange list grows over time
    exchange: String,
    status: AssetStatus,
    tradable: bool,
}

impl Asset {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn status(&self) -> AssetStatus {
        self.status
    }

    pub fn tradable(&self) -> bool {
        self.tradable
    }
}

/// A trading day of the broker calendar. Times are expressed in the exchange time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CalendarDay {
    date: NaiveDate,
    #[serde(with = "serde_util::clock_time")]
    open: NaiveTime,
    #[serde(with = "serde_util::clock_time")]
    close: NaiveTime,
}

impl CalendarDay {
    pub fn new(date: NaiveDate, open: NaiveTime, close: NaiveTime) -> Self {
        Self { date, open, close }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    /// Regular session open as a zoned timestamp. `None` if the local time does not exist in `tz`.
    pub fn open_at(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        util::local_datetime(tz, self.date, self.open)
    }

    /// Regular session close as a zoned timestamp. `None` if the local time does not exist in `tz`.
    pub fn close_at(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        util::local_datetime(tz, self.date, self.close)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DataFeed {
    Iex,
    #[default]
    Sip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Adjustment {
    #[default]
    Raw,
    Split,
    Dividend,
    All,
}

/// Daily bars request for a set of symbols.
#[derive(Debug, Clone)]
pub struct BarsRequest {
    symbols: Vec<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    feed: DataFeed,
    adjustment: Adjustment,
}

impl BarsRequest {
    pub fn new(symbols: Vec<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            symbols,
            start,
            end,
            feed: DataFeed::default(),
            adjustment: Adjustment::default(),
        }
    }

    pub fn with_feed(mut self, feed: DataFeed) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_adjustment(mut self, adjustment: Adjustment) -> Self {
        self.adjustment = adjustment;
        self
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn feed(&self) -> DataFeed {
        self.feed
    }

    pub fn adjustment(&self) -> Adjustment {
        self.adjustment
    }
}

/// A daily OHLCV bar of a single symbol, as returned by the market data API.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBar {
    pub symbol: String,
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl fmt::Display for RawBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} o={} h={} l={} c={} v={}",
            self.symbol,
            self.time.to_rfc3339(),
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BarEntry {
    #[serde(rename = "t")]
    time: DateTime<Utc>,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v")]
    volume: f64,
}

impl BarEntry {
    fn into_raw_bar(self, symbol: String) -> RawBar {
        RawBar {
            symbol,
            time: self.time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

/// One page of the multi-symbol bars endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BarsPage {
    #[serde(default)]
    bars: Option<HashMap<String, Vec<BarEntry>>>,
    next_page_token: Option<String>,
}

impl BarsPage {
    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn into_raw_bars(self) -> Vec<RawBar> {
        self.bars
            .unwrap_or_default()
            .into_iter()
            .flat_map(|(symbol, entries)| {
                entries
                    .into_iter()
                    .map(move |entry| entry.into_raw_bar(symbol.clone()))
            })
            .collect()
    }
}

/// Outcome of liquidating one position.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClosePositionResult {
    symbol: String,
    status: u16,
}

impl ClosePositionResult {
    pub fn new(symbol: impl ToString, status: u16) -> Self {
        Self {
            symbol: symbol.to_string(),
            status,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// HTTP status of the individual close order.
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
