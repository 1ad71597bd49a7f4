use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::{Notify, broadcast};

use crate::{
    api::rest::models::ClosePositionResult,
    scan::{HistoricalTable, OhlcBar},
    session::Session,
    shared::PercentChange,
};

use super::process::error::BotProcessError;

#[cfg(test)]
mod tests;

/// Per-symbol premarket watch created from the most recent historical close.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolWatch {
    symbol: String,
    initial_price: f64,
    threshold_price: f64,
    consolidated_bars: Vec<OhlcBar>,
}

impl SymbolWatch {
    pub fn new(symbol: impl ToString, initial_price: f64, change: PercentChange) -> Self {
        Self {
            symbol: symbol.to_string(),
            initial_price,
            threshold_price: change.apply(initial_price),
            consolidated_bars: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn initial_price(&self) -> f64 {
        self.initial_price
    }

    /// Price at which the symbol has risen by the configured premarket percent change.
    pub fn threshold_price(&self) -> f64 {
        self.threshold_price
    }

    pub fn consolidated_bars(&self) -> &[OhlcBar] {
        &self.consolidated_bars
    }

    /// Appends a consolidated bar. Bars are kept in arrival order.
    pub fn push_bar(&mut self, bar: OhlcBar) {
        self.consolidated_bars.push(bar);
    }
}

/// Process-wide exit request, observed by the cycle at the top of each iteration.
#[derive(Debug, Default)]
pub(crate) struct ExitFlag {
    requested: AtomicBool,
    notify: Notify,
}

impl ExitFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Completes once exit has been requested.
    pub async fn requested(&self) {
        loop {
            let notified = self.notify.notified();

            if self.is_requested() {
                return;
            }

            notified.await;
        }
    }
}

/// Mutable trading state owned by the cycle.
///
/// Watches are rebuilt at the start of every iteration.
#[derive(Debug)]
pub(crate) struct BotState {
    exit: Arc<ExitFlag>,
    min_premarket_percent_change: PercentChange,
    watches: BTreeMap<String, SymbolWatch>,
    session: Option<Session>,
    year_bars: Option<HistoricalTable>,
}

impl BotState {
    pub fn new(exit: Arc<ExitFlag>, min_premarket_percent_change: PercentChange) -> Self {
        Self {
            exit,
            min_premarket_percent_change,
            watches: BTreeMap::new(),
            session: None,
            year_bars: None,
        }
    }

    pub fn exit_flag(&self) -> &ExitFlag {
        &self.exit
    }

    pub fn should_exit(&self) -> bool {
        self.exit.is_requested()
    }

    pub fn watches(&self) -> &BTreeMap<String, SymbolWatch> {
        &self.watches
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn set_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    pub fn year_bars(&self) -> Option<&HistoricalTable> {
        self.year_bars.as_ref()
    }

    pub fn set_year_bars(&mut self, table: HistoricalTable) {
        self.year_bars = Some(table);
    }

    /// Replaces every watch with one per symbol of `table`, priced at its most recent close.
    /// Returns the watched symbols.
    pub fn reset_watches(&mut self, table: &HistoricalTable) -> BTreeSet<String> {
        self.watches = table
            .symbols()
            .into_iter()
            .filter_map(|symbol| {
                let close = table.last_close(&symbol)?;
                let watch = SymbolWatch::new(&symbol, close, self.min_premarket_percent_change);
                Some((symbol, watch))
            })
            .collect();

        self.watches.keys().cloned().collect()
    }

    pub fn thresholds(&self) -> BTreeMap<String, f64> {
        self.watches
            .iter()
            .map(|(symbol, watch)| (symbol.clone(), watch.threshold_price()))
            .collect()
    }
}

/// Step of the trading cycle currently being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    FetchingUniverse,
    FetchingHistory,
    ComputingThresholds,
    Subscribed,
    Waiting,
    Liquidating,
    Unsubscribed,
    Idle,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchingUniverse => write!(f, "Fetching universe"),
            Self::FetchingHistory => write!(f, "Fetching history"),
            Self::ComputingThresholds => write!(f, "Computing thresholds"),
            Self::Subscribed => write!(f, "Subscribed"),
            Self::Waiting => write!(f, "Waiting for liquidation"),
            Self::Liquidating => write!(f, "Liquidating"),
            Self::Unsubscribed => write!(f, "Unsubscribed"),
            Self::Idle => write!(f, "Idle"),
        }
    }
}

/// Represents the current status of the trading bot.
#[derive(Debug, Clone)]
pub enum BotStatus {
    /// Bot has been created but not yet started.
    NotInitiated,
    /// Transport and cycle tasks are being spawned.
    Starting,
    /// The cycle is executing the given phase.
    Running(CyclePhase),
    /// Shutdown has been initiated.
    ShutdownInitiated,
    /// Bot stopped after an exit request.
    Shutdown,
    /// Bot stopped because of a fatal error.
    Terminated(Arc<BotProcessError>),
}

impl BotStatus {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Shutdown | Self::Terminated(_))
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitiated => write!(f, "Not initiated"),
            Self::Starting => write!(f, "Starting"),
            Self::Running(phase) => write!(f, "Running ({phase})"),
            Self::ShutdownInitiated => write!(f, "Shutdown initiated"),
            Self::Shutdown => write!(f, "Shutdown"),
            Self::Terminated(error) => write!(f, "Terminated: {error}"),
        }
    }
}

impl From<CyclePhase> for BotStatus {
    fn from(value: CyclePhase) -> Self {
        Self::Running(value)
    }
}

impl From<Arc<BotProcessError>> for BotStatus {
    fn from(value: Arc<BotProcessError>) -> Self {
        Self::Terminated(value)
    }
}

impl From<BotProcessError> for BotStatus {
    fn from(value: BotProcessError) -> Self {
        Arc::new(value).into()
    }
}

/// Update events emitted by the bot.
#[derive(Debug, Clone)]
pub enum BotUpdate {
    /// Bot status changed.
    Status(BotStatus),
    /// The session was refreshed.
    Session(Session),
    /// Positions were liquidated.
    Liquidation(Vec<ClosePositionResult>),
}

impl From<BotStatus> for BotUpdate {
    fn from(value: BotStatus) -> Self {
        Self::Status(value)
    }
}

impl From<Session> for BotUpdate {
    fn from(value: Session) -> Self {
        Self::Session(value)
    }
}

pub(super) type BotTransmitter = broadcast::Sender<BotUpdate>;

/// Receiver for subscribing to [`BotUpdate`]s.
pub type BotReceiver = broadcast::Receiver<BotUpdate>;

#[derive(Debug)]
pub(super) struct BotStatusManager {
    status: Mutex<BotStatus>,
    update_tx: BotTransmitter,
}

impl BotStatusManager {
    pub fn new(update_tx: BotTransmitter) -> Arc<Self> {
        let status = Mutex::new(BotStatus::NotInitiated);

        Arc::new(Self { status, update_tx })
    }

    fn lock_status(&self) -> MutexGuard<'_, BotStatus> {
        self.status
            .lock()
            .expect("`BotStatusManager` mutex can't be poisoned")
    }

    fn update_status_guard(
        &self,
        mut status_guard: MutexGuard<'_, BotStatus>,
        new_status: BotStatus,
    ) {
        *status_guard = new_status.clone();
        drop(status_guard);

        tracing::info!("bot status: {new_status}");

        // Ignore no-receivers errors
        let _ = self.update_tx.send(new_status.into());
    }

    pub fn update(&self, new_status: BotStatus) {
        let status_guard = self.lock_status();

        self.update_status_guard(status_guard, new_status);
    }

    /// Updates the cycle phase unless shutdown is in progress or the bot already stopped.
    pub fn update_phase(&self, phase: CyclePhase) {
        let status_guard = self.lock_status();

        if matches!(*status_guard, BotStatus::ShutdownInitiated) || status_guard.is_stopped() {
            return;
        }

        self.update_status_guard(status_guard, phase.into());
    }

    pub fn update_receiver(&self) -> BotReceiver {
        self.update_tx.subscribe()
    }

    pub fn status_snapshot(&self) -> BotStatus {
        self.lock_status().clone()
    }
}
