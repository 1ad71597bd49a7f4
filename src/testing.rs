//! In-memory doubles of the broker and streaming collaborators.

use std::{
    collections::BTreeSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::US::Eastern;
use reqwest::StatusCode;
use tokio::sync::Notify;

use crate::{
    api::{
        rest::{
            error::{RestApiError, Result as RestResult},
            models::{
                Asset, AssetFilter, BarsRequest, CalendarDay, ClosePositionResult, RawBar,
            },
            repositories::{MarketDataRepository, TradingRepository},
        },
        websocket::{
            error::{Result as WsResult, WebSocketApiError},
            repositories::{
                DataStreamRepository, TradeHandler, TradeUpdateHandler, TradeUpdateRepository,
            },
            state::WsConnectionStatus,
        },
    },
    bot::{
        BotConfig, BotReceiver, BotStatus, BotUpdate, CyclePhase, TradingBot, clock::Clock,
    },
    util::Never,
};

pub(crate) fn eastern(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Eastern
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub(crate) fn calendar_day(date: NaiveDate, open: (u32, u32), close: (u32, u32)) -> CalendarDay {
    CalendarDay::new(
        date,
        NaiveTime::from_hms_opt(open.0, open.1, 0).unwrap(),
        NaiveTime::from_hms_opt(close.0, close.1, 0).unwrap(),
    )
}

pub(crate) fn asset(symbol: &str, tradable: bool) -> Asset {
    let json = format!(
        r#"{{"id":"{}","symbol":"{symbol}","exchange":"NASDAQ","status":"active","tradable":{tradable}}}"#,
        uuid::Uuid::new_v4()
    );
    serde_json::from_str(&json).unwrap()
}

pub(crate) fn bar(symbol: &str, time: DateTime<Utc>, close: f64) -> RawBar {
    RawBar {
        symbol: symbol.to_string(),
        time,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000.,
    }
}

pub(crate) fn error_response() -> RestApiError {
    RestApiError::ErrorResponse {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        text: "internal error".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TradingCall {
    Assets,
    Calendar(Option<NaiveDate>, NaiveDate),
    CloseAll(bool),
}

#[derive(Default)]
pub(crate) struct MockTrading {
    pub assets: Vec<Asset>,
    pub calendar: Vec<CalendarDay>,
    pub fail_calendar: bool,
    pub fail_close: bool,
    pub calls: Mutex<Vec<TradingCall>>,
}

impl MockTrading {
    pub fn calls(&self) -> Vec<TradingCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradingRepository for MockTrading {
    async fn tradable_assets(&self, _filter: &AssetFilter) -> RestResult<Vec<Asset>> {
        self.calls.lock().unwrap().push(TradingCall::Assets);
        Ok(self.assets.clone())
    }

    async fn calendar(
        &self,
        start: Option<NaiveDate>,
        end: NaiveDate,
    ) -> RestResult<Vec<CalendarDay>> {
        self.calls
            .lock()
            .unwrap()
            .push(TradingCall::Calendar(start, end));

        if self.fail_calendar {
            return Err(error_response());
        }

        Ok(self
            .calendar
            .iter()
            .filter(|day| start.is_none_or(|start| day.date() >= start) && day.date() <= end)
            .copied()
            .collect())
    }

    async fn close_all_positions(
        &self,
        cancel_orders: bool,
    ) -> RestResult<Vec<ClosePositionResult>> {
        self.calls
            .lock()
            .unwrap()
            .push(TradingCall::CloseAll(cancel_orders));

        if self.fail_close {
            return Err(error_response());
        }

        Ok(vec![ClosePositionResult::new("SIRI", 200)])
    }
}

#[derive(Default)]
pub(crate) struct MockMarketData {
    pub bars: Vec<RawBar>,
    pub requests: Mutex<Vec<BarsRequest>>,
}

impl MockMarketData {
    pub fn requests(&self) -> Vec<BarsRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataRepository for MockMarketData {
    async fn bars(&self, request: &BarsRequest) -> RestResult<Vec<RawBar>> {
        self.requests.lock().unwrap().push(request.clone());

        Ok(self
            .bars
            .iter()
            .filter(|bar| {
                request.symbols().contains(&bar.symbol)
                    && bar.time >= request.start()
                    && bar.time <= request.end()
            })
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StreamCall {
    Subscribe(BTreeSet<String>),
    Unsubscribe(BTreeSet<String>),
}

/// Data stream double. `run_forever` parks until `fail` is notified, then returns an error.
pub(crate) struct MockDataStream {
    connected: AtomicBool,
    subscribed: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<StreamCall>>,
    fail: Notify,
}

impl MockDataStream {
    pub fn new(connected: bool) -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(connected),
            subscribed: Mutex::new(BTreeSet::new()),
            calls: Mutex::new(Vec::new()),
            fail: Notify::new(),
        })
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<StreamCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail(&self) {
        self.fail.notify_one();
    }
}

#[async_trait]
impl DataStreamRepository for MockDataStream {
    fn connection_status(&self) -> Arc<WsConnectionStatus> {
        if self.is_connected() {
            Arc::new(WsConnectionStatus::Connected)
        } else {
            Arc::new(WsConnectionStatus::NotConnected)
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn subscribe_trades(
        &self,
        symbols: &BTreeSet<String>,
        _handler: Arc<dyn TradeHandler>,
    ) -> WsResult<()> {
        if symbols.is_empty() {
            return Ok(());
        }

        if !self.is_connected() {
            return Err(WebSocketApiError::NotConnected(self.connection_status()));
        }

        self.subscribed.lock().unwrap().extend(symbols.iter().cloned());
        self.calls
            .lock()
            .unwrap()
            .push(StreamCall::Subscribe(symbols.clone()));

        Ok(())
    }

    async fn unsubscribe_trades(&self, symbols: &BTreeSet<String>) -> WsResult<()> {
        if symbols.is_empty() {
            return Ok(());
        }

        let mut subscribed = self.subscribed.lock().unwrap();
        for symbol in symbols {
            subscribed.remove(symbol);
        }
        self.calls
            .lock()
            .unwrap()
            .push(StreamCall::Unsubscribe(symbols.clone()));

        Ok(())
    }

    fn subscribed_symbols(&self) -> BTreeSet<String> {
        self.subscribed.lock().unwrap().clone()
    }

    async fn run_forever(&self) -> WsResult<Never> {
        self.fail.notified().await;
        self.set_connected(false);

        Err(WebSocketApiError::ServerRequestedClose)
    }
}

/// Trade update stream double that never delivers and never fails.
pub(crate) struct IdleTradeUpdates;

#[async_trait]
impl TradeUpdateRepository for IdleTradeUpdates {
    fn connection_status(&self) -> Arc<WsConnectionStatus> {
        Arc::new(WsConnectionStatus::Connected)
    }

    async fn run_forever(&self, _handler: Arc<dyn TradeUpdateHandler>) -> WsResult<Never> {
        std::future::pending().await
    }
}

/// Wall clock that starts at `origin` and advances with the (possibly paused) tokio clock.
pub(crate) struct MockClock {
    origin: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl MockClock {
    pub fn new(origin: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            origin,
            start: tokio::time::Instant::now(),
        })
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.origin + chrono::Duration::from_std(self.start.elapsed()).unwrap()
    }
}

/// Regular sessions (09:30 to 16:00) on the given days of March 2025.
pub(crate) fn march_2025_calendar(days: &[u32]) -> Vec<CalendarDay> {
    days.iter()
        .map(|d| calendar_day(NaiveDate::from_ymd_opt(2025, 3, *d).unwrap(), (9, 30), (16, 0)))
        .collect()
}

/// Broker, stream and clock doubles wired into a [`TradingBot`].
pub(crate) struct BotFixture {
    pub trading: Arc<MockTrading>,
    pub market_data: Arc<MockMarketData>,
    pub stream: Arc<MockDataStream>,
    pub clock: Arc<MockClock>,
}

impl BotFixture {
    pub fn new(
        origin: DateTime<Utc>,
        trading: MockTrading,
        bars: Vec<RawBar>,
        connected: bool,
    ) -> Self {
        Self {
            trading: Arc::new(trading),
            market_data: Arc::new(MockMarketData {
                bars,
                ..Default::default()
            }),
            stream: MockDataStream::new(connected),
            clock: MockClock::new(origin),
        }
    }

    pub fn bot(&self, config: BotConfig) -> TradingBot {
        TradingBot::new(
            config,
            self.trading.clone(),
            self.market_data.clone(),
            self.stream.clone(),
            Arc::new(IdleTradeUpdates),
        )
        .with_clock(self.clock.clone())
    }

    pub fn close_all_calls(&self) -> usize {
        self.trading
            .calls()
            .iter()
            .filter(|call| matches!(call, TradingCall::CloseAll(_)))
            .count()
    }
}

pub(crate) async fn next_liquidation(rx: &mut BotReceiver) -> Vec<ClosePositionResult> {
    loop {
        if let BotUpdate::Liquidation(results) = rx.recv().await.unwrap() {
            return results;
        }
    }
}

pub(crate) async fn wait_for_phase(rx: &mut BotReceiver, phase: CyclePhase) {
    loop {
        if let BotUpdate::Status(BotStatus::Running(p)) = rx.recv().await.unwrap() {
            if p == phase {
                return;
            }
        }
    }
}
