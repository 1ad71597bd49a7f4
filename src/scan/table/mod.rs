use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveTime};
use chrono_tz::Tz;
use strum::Display;

use crate::{api::rest::models::RawBar, shared::PriceBand};


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OhlcBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl OhlcBar {
    pub fn get(&self, field: BarField) -> f64 {
        match field {
            BarField::Open => self.open,
            BarField::High => self.high,
            BarField::Low => self.low,
            BarField::Close => self.close,
        }
    }
}

impl From<&RawBar> for OhlcBar {
    fn from(value: &RawBar) -> Self {
        Self {
            open: value.open,
            high: value.high,
            low: value.low,
            close: value.close,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BarField {
    Open,
    High,
    Low,
    Close,
}

/// Bars pivoted by timestamp, with one (field, symbol) column per symbol and OHLC field.
///
/// Rows are ordered by time in the exchange time zone. Cells are absent where a symbol has no
/// bar or its bar was filtered out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalTable {
    rows: BTreeMap<DateTime<Tz>, BTreeMap<String, OhlcBar>>,
}

impl HistoricalTable {
    /// Pivots `raw` bars and keeps only:
    ///
    /// - rows timestamped before `cutoff` (local time in `tz`), dropping post-market bars;
    /// - cells whose close lies strictly inside `band`.
    ///
    /// Symbols left without any cell disappear from the table.
    pub fn clean(raw: Vec<RawBar>, tz: &Tz, cutoff: NaiveTime, band: &PriceBand) -> Self {
        let mut rows: BTreeMap<DateTime<Tz>, BTreeMap<String, OhlcBar>> = BTreeMap::new();

        for bar in raw {
            let time = bar.time.with_timezone(tz);

            if time.time() >= cutoff {
                continue;
            }

            if !band.contains(bar.close) {
                continue;
            }

            let ohlc = OhlcBar::from(&bar);
            rows.entry(time).or_default().insert(bar.symbol, ohlc);
        }

        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows (distinct timestamps).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Every symbol with at least one cell.
    pub fn symbols(&self) -> BTreeSet<String> {
        self.rows
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = &DateTime<Tz>> {
        self.rows.keys()
    }

    pub fn value(&self, time: &DateTime<Tz>, field: BarField, symbol: &str) -> Option<f64> {
        self.rows
            .get(time)
            .and_then(|row| row.get(symbol))
            .map(|bar| bar.get(field))
    }

    /// Non-empty cells of one column, in time order.
    pub fn column(&self, field: BarField, symbol: &str) -> Vec<(DateTime<Tz>, f64)> {
        self.rows
            .iter()
            .filter_map(|(time, row)| row.get(symbol).map(|bar| (*time, bar.get(field))))
            .collect()
    }

    /// Most recent close of `symbol`.
    pub fn last_close(&self, symbol: &str) -> Option<f64> {
        self.rows
            .values()
            .rev()
            .find_map(|row| row.get(symbol).map(|bar| bar.close))
    }
}
