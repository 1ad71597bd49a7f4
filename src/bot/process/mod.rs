use std::{collections::BTreeSet, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::time::{self, Instant};

use crate::{
    api::{DataStreamClient, MarketDataClient, TradeHandler, TradingClient},
    scan::Scanner,
    session::{Session, SessionTracker},
    util::AbortOnDropHandle,
};

use super::{
    clock::Clock,
    config::{BotConfig, BotProcessConfig},
    handlers::LoggingTradeHandler,
    state::{BotState, BotStatus, BotStatusManager, BotTransmitter, BotUpdate, CyclePhase, ExitFlag},
    subscription::SubscriptionManager,
};

pub(crate) mod error;
mod transport;

use error::{BotProcessError, Result};

pub(super) use transport::Transport;

#[cfg(test)]
mod tests;

/// Margin added when idling until a session boundary, so the boundary has passed on wake-up.
const IDLE_MARGIN: Duration = Duration::from_secs(1);

/// Time to sleep before liquidating: the time left until `close` minus `lead`, clamped to zero.
pub(crate) fn liquidation_wait(now: DateTime<Utc>, close: DateTime<Tz>, lead: Duration) -> Duration {
    let Ok(lead) = chrono::Duration::from_std(lead) else {
        return Duration::ZERO;
    };

    (close.with_timezone(&Utc) - now)
        .checked_sub(&lead)
        .and_then(|wait| wait.to_std().ok())
        .unwrap_or(Duration::ZERO)
}

/// Collaborators of the trading cycle.
pub(super) struct CycleParts {
    pub trading: TradingClient,
    pub market_data: MarketDataClient,
    pub data_stream: DataStreamClient,
    pub tick_handler: Option<Arc<dyn TradeHandler>>,
    pub clock: Arc<dyn Clock>,
}

pub(super) struct BotProcess {
    config: BotProcessConfig,
    trading: TradingClient,
    scanner: Scanner,
    session_tracker: SessionTracker,
    subscriptions: SubscriptionManager,
    tick_handler: Option<Arc<dyn TradeHandler>>,
    clock: Arc<dyn Clock>,
    state: BotState,
    status_manager: Arc<BotStatusManager>,
    update_tx: BotTransmitter,
}

impl BotProcess {
    pub fn new(
        config: &BotConfig,
        parts: CycleParts,
        exit: Arc<ExitFlag>,
        status_manager: Arc<BotStatusManager>,
        update_tx: BotTransmitter,
    ) -> Self {
        let scanner = Scanner::new(
            parts.trading.clone(),
            parts.market_data,
            config.into(),
        );
        let session_tracker = SessionTracker::new(parts.trading.clone(), config.into());

        Self {
            config: config.into(),
            trading: parts.trading,
            scanner,
            session_tracker,
            subscriptions: SubscriptionManager::new(parts.data_stream),
            tick_handler: parts.tick_handler,
            clock: parts.clock,
            state: BotState::new(exit, config.min_premarket_percent_change()),
            status_manager,
            update_tx,
        }
    }

    /// Spawns the transport and the cycle and joins them. The final status is published through
    /// the status manager.
    pub fn spawn(self, transport: Transport) -> AbortOnDropHandle<()> {
        tokio::spawn(async move {
            let status_manager = self.status_manager.clone();
            status_manager.update(BotStatus::Starting);

            let transport_handle = transport.spawn();
            let cycle_handle: AbortOnDropHandle<Result<()>> =
                tokio::spawn(self.run_cycle_loop()).into();

            match Self::join_fail_fast(transport_handle, cycle_handle).await {
                Ok(()) => status_manager.update(BotStatus::Shutdown),
                Err(e) => {
                    tracing::error!("bot process terminated: {e}");
                    status_manager.update(e.into());
                }
            }
        })
        .into()
    }

    /// Waits for whichever task finishes first. Returning drops both handles, aborting the
    /// other task.
    async fn join_fail_fast(
        mut transport: AbortOnDropHandle<BotProcessError>,
        mut cycle: AbortOnDropHandle<Result<()>>,
    ) -> Result<()> {
        tokio::select! {
            join_res = &mut transport => match join_res {
                Ok(e) => Err(e),
                Err(e) => Err(BotProcessError::TransportTaskJoin(e)),
            },
            join_res = &mut cycle => match join_res {
                Ok(res) => res,
                Err(e) => Err(BotProcessError::CycleTaskJoin(e)),
            },
        }
    }

    async fn run_cycle_loop(mut self) -> Result<()> {
        loop {
            if self.state.should_exit() {
                tracing::info!("exit requested, stopping trading cycle");
                return Ok(());
            }

            self.run_iteration().await?;
        }
    }

    fn set_phase(&self, phase: CyclePhase) {
        self.status_manager.update_phase(phase);
    }

    fn send_update(&self, update: BotUpdate) {
        // Ignore no-receivers errors
        let _ = self.update_tx.send(update);
    }

    async fn run_iteration(&mut self) -> Result<()> {
        self.set_phase(CyclePhase::FetchingUniverse);

        let symbols = self.scanner.tradable_symbols().await?;

        self.set_phase(CyclePhase::FetchingHistory);

        let now = self.clock.now();

        let (year_bars, recent) = futures::try_join!(
            self.scanner.year_bars(&symbols, now),
            self.scanner.recent_sessions_bars(&symbols, now)
        )?;

        tracing::info!(
            rows = year_bars.len(),
            symbols = year_bars.symbols().len(),
            "fetched year bars"
        );
        self.state.set_year_bars(year_bars);

        self.set_phase(CyclePhase::ComputingThresholds);

        let live_symbols = self.state.reset_watches(&recent);
        if live_symbols.is_empty() {
            tracing::warn!("no symbols passed the price band, skipping subscription");
        } else {
            tracing::info!(symbols = live_symbols.len(), "computed premarket thresholds");
        }

        let Some(subscribed) = self.subscribe_deferred(&live_symbols).await? else {
            return Ok(());
        };

        self.set_phase(CyclePhase::Subscribed);

        let session = self.refresh_session().await?;

        match session.close_time() {
            Some(close) => {
                let wait = liquidation_wait(self.clock.now(), close, self.config.liquidation_lead());

                self.set_phase(CyclePhase::Waiting);
                tracing::info!("liquidating in {}s, session close at {close}", wait.as_secs());

                time::sleep(wait).await;

                self.liquidate().await?;
                self.unsubscribe(&subscribed).await?;

                self.idle_until(close.with_timezone(&Utc)).await;
            }
            None => {
                tracing::info!("session close unknown, skipping liquidation");

                self.unsubscribe(&subscribed).await?;

                self.idle_until(session.open_time().with_timezone(&Utc))
                    .await;
            }
        }

        tracing::debug!(
            watches = self.state.watches().len(),
            year_rows = self.state.year_bars().map_or(0, |table| table.len()),
            session = ?self.state.session(),
            "cycle iteration complete"
        );

        Ok(())
    }

    fn trade_handler(&self) -> Arc<dyn TradeHandler> {
        match &self.tick_handler {
            Some(handler) => handler.clone(),
            None => Arc::new(LoggingTradeHandler::new(self.state.thresholds())),
        }
    }

    /// Subscribes to `symbols`, retrying while the data stream is not connected.
    ///
    /// Returns the subscribed set, empty if the stream stayed down for `subscribe_max_wait`, or
    /// `None` if exit was requested while deferring.
    async fn subscribe_deferred(
        &mut self,
        symbols: &BTreeSet<String>,
    ) -> Result<Option<BTreeSet<String>>> {
        let handler = self.trade_handler();
        let deadline = Instant::now() + self.config.subscribe_max_wait();

        loop {
            match self.subscriptions.subscribe(symbols, handler.clone()).await {
                Ok(()) => return Ok(Some(symbols.clone())),
                Err(e) if e.is_not_connected() => {
                    if Instant::now() >= deadline {
                        tracing::warn!(
                            "{e}, skipping subscription for this cycle after {}s",
                            self.config.subscribe_max_wait().as_secs()
                        );
                        return Ok(Some(BTreeSet::new()));
                    }

                    tracing::debug!("deferring subscription: {e}");

                    tokio::select! {
                        _ = time::sleep(self.config.subscribe_retry_interval()) => {}
                        _ = self.state.exit_flag().requested() => return Ok(None),
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn refresh_session(&mut self) -> Result<Session> {
        let now = self.clock.now();
        let session = self.session_tracker.refresh_at(now).await?;

        tracing::info!(
            "session {}: {session}",
            session.phase(now, self.config.liquidation_lead())
        );

        self.state.set_session(session);
        self.send_update(session.into());

        Ok(session)
    }

    async fn liquidate(&self) -> Result<()> {
        self.set_phase(CyclePhase::Liquidating);

        let results = self
            .trading
            .close_all_positions(true)
            .await
            .map_err(BotProcessError::Liquidation)?;

        for result in results.iter() {
            if result.is_success() {
                tracing::info!(symbol = result.symbol(), "position closed");
            } else {
                tracing::warn!(
                    symbol = result.symbol(),
                    status = result.status(),
                    "position close rejected"
                );
            }
        }

        self.send_update(BotUpdate::Liquidation(results));

        Ok(())
    }

    async fn unsubscribe(&mut self, symbols: &BTreeSet<String>) -> Result<()> {
        self.subscriptions.unsubscribe(symbols).await?;

        self.set_phase(CyclePhase::Unsubscribed);

        Ok(())
    }

    /// Sleeps until `target` has passed. Returns early if exit is requested.
    async fn idle_until(&self, target: DateTime<Utc>) {
        self.set_phase(CyclePhase::Idle);

        loop {
            let now = self.clock.now();
            if now > target {
                return;
            }

            let wait = (target - now).to_std().unwrap_or_default() + IDLE_MARGIN;

            tracing::info!("idling {}s until {target}", wait.as_secs());

            tokio::select! {
                _ = time::sleep(wait) => {}
                _ = self.state.exit_flag().requested() => return,
            }
        }
    }
}
