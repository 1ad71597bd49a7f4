use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::{
    api::{
        MarketDataClient, TradingClient,
        rest::models::{AssetFilter, BarsRequest, CalendarDay, DataFeed},
    },
    shared::PriceBand,
};

pub(crate) mod error;
mod table;

use error::{Result, ScanError};

pub use table::{BarField, HistoricalTable, OhlcBar};


/// Calendar entries needed for the recent-sessions window: the three sessions before the most
/// recent one.
const RECENT_SESSIONS: usize = 3;

#[derive(Clone, Debug)]
pub(crate) struct ScannerConfig {
    pub tz: Tz,
    pub session_cutoff: NaiveTime,
    pub price_band: PriceBand,
    pub asset_filter: AssetFilter,
    pub data_feed: DataFeed,
    pub recent_calendar_lookback: Days,
    pub year_lookback: Duration,
    pub bars_end_delay: Duration,
}

/// Symbol universe and historical bars provider.
pub struct Scanner {
    trading: TradingClient,
    market_data: MarketDataClient,
    config: ScannerConfig,
}

impl Scanner {
    pub(crate) fn new(
        trading: TradingClient,
        market_data: MarketDataClient,
        config: ScannerConfig,
    ) -> Self {
        Self {
            trading,
            market_data,
            config,
        }
    }

    /// Symbols of the filtered universe that the broker flags as tradable.
    pub async fn tradable_symbols(&self) -> Result<Vec<String>> {
        let assets = self
            .trading
            .tradable_assets(&self.config.asset_filter)
            .await?;

        let symbols: Vec<String> = assets
            .into_iter()
            .filter(|asset| asset.tradable())
            .map(|asset| asset.symbol().to_string())
            .collect();

        tracing::debug!(symbols = symbols.len(), "fetched tradable universe");

        Ok(symbols)
    }

    /// Cleaned daily bars over the year ending `bars_end_delay` before `now`.
    pub async fn year_bars(
        &self,
        symbols: &[String],
        now: DateTime<Utc>,
    ) -> Result<HistoricalTable> {
        let end = now - self.config.bars_end_delay;
        let start = end - self.config.year_lookback;

        self.fetch_clean(symbols, start, end).await
    }

    /// Cleaned daily bars over the sessions preceding the most recent calendar entry.
    pub async fn recent_sessions_bars(
        &self,
        symbols: &[String],
        now: DateTime<Utc>,
    ) -> Result<HistoricalTable> {
        let (start, end) = self.recent_sessions_window(now).await?;

        self.fetch_clean(symbols, start, end).await
    }

    async fn recent_sessions_window(
        &self,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let today = now.date_naive();
        let start = today.checked_sub_days(self.config.recent_calendar_lookback);

        let calendar = self.trading.calendar(start, today).await?;

        let required = RECENT_SESSIONS + 1;
        if calendar.len() < required {
            return Err(ScanError::InsufficientCalendar {
                found: calendar.len(),
                required,
            });
        }

        // Most recent entry excluded
        let window = &calendar[calendar.len() - required..calendar.len() - 1];

        let first = &window[0];
        let last = &window[window.len() - 1];

        let start = self.zoned(first, first.open_at(&self.config.tz), first.open())?;
        let end = self.zoned(last, last.close_at(&self.config.tz), last.close())?;

        Ok((start, end))
    }

    fn zoned(
        &self,
        day: &CalendarDay,
        resolved: Option<DateTime<Tz>>,
        time: NaiveTime,
    ) -> Result<DateTime<Utc>> {
        resolved
            .map(|t| t.with_timezone(&Utc))
            .ok_or(ScanError::InvalidLocalTime {
                date: day.date(),
                time,
            })
    }

    async fn fetch_clean(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HistoricalTable> {
        if symbols.is_empty() {
            return Ok(HistoricalTable::default());
        }

        let request =
            BarsRequest::new(symbols.to_vec(), start, end).with_feed(self.config.data_feed);
        let raw = self.market_data.bars(&request).await?;

        tracing::debug!(
            bars = raw.len(),
            start = %start,
            end = %end,
            "fetched daily bars"
        );

        let tz = self.config.tz;
        let cutoff = self.config.session_cutoff;
        let band = self.config.price_band;

        let table =
            tokio::task::spawn_blocking(move || HistoricalTable::clean(raw, &tz, cutoff, &band))
                .await
                .map_err(ScanError::CleanTaskJoin)?;

        Ok(table)
    }
}
