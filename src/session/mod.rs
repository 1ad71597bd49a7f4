use std::{fmt, time::Duration};

use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::{
    api::{TradingClient, rest::models::CalendarDay},
    util::LocalTimeExt,
};

pub(crate) mod error;

use error::{Result, SessionError};


/// Session evaluation parameters: the exchange time zone and the premarket-open estimate used
/// when no regular session is ahead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionParams {
    tz: Tz,
    premarket_open: NaiveTime,
}

impl SessionParams {
    pub fn new(tz: Tz, premarket_open: NaiveTime) -> Self {
        Self { tz, premarket_open }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn premarket_open(&self) -> NaiveTime {
        self.premarket_open
    }
}

/// Coarse market phase derived from a [`Session`] at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    PreOpen,
    Open,
    ApproachingClose,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreOpen => write!(f, "Pre-open"),
            Self::Open => write!(f, "Open"),
            Self::ApproachingClose => write!(f, "Approaching close"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// Trading day state as of one evaluation instant.
///
/// Exactly one of the following holds: the session is open, the open lies ahead
/// (`time_to_open_secs > 0`), or the session was reset to the next premarket-open estimate with
/// no close time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    open_time: DateTime<Tz>,
    close_time: Option<DateTime<Tz>>,
    is_open: bool,
    time_to_open_secs: i64,
}

impl Session {
    /// Evaluates the session at `now` against today's calendar entry (`None` on non-trading
    /// days).
    ///
    /// Boundaries are strict: `now == open` and `now >= close` both reset the session.
    pub fn evaluate(
        now: DateTime<Utc>,
        day: Option<&CalendarDay>,
        params: &SessionParams,
    ) -> Result<Self> {
        let tz = params.tz();
        let now = now.with_timezone(&tz);

        let Some(day) = day else {
            return Self::reset(now, params);
        };

        let open_time = day
            .open_at(&tz)
            .ok_or(SessionError::InvalidLocalTime {
                date: day.date(),
                time: day.open(),
                tz,
            })?;
        let close_time = day
            .close_at(&tz)
            .ok_or(SessionError::InvalidLocalTime {
                date: day.date(),
                time: day.close(),
                tz,
            })?;

        if now > open_time && now < close_time {
            return Ok(Self {
                open_time,
                close_time: Some(close_time),
                is_open: true,
                time_to_open_secs: 0,
            });
        }

        if now < open_time {
            return Ok(Self {
                open_time,
                close_time: Some(close_time),
                is_open: false,
                time_to_open_secs: (open_time - now).num_seconds(),
            });
        }

        Self::reset(now, params)
    }

    /// Session rolled forward to the next premarket-open estimate strictly after `now`.
    pub fn reset(now: DateTime<Tz>, params: &SessionParams) -> Result<Self> {
        let open_time =
            now.next_local_time(params.premarket_open())
                .ok_or(SessionError::InvalidLocalTime {
                    date: now.date_naive(),
                    time: params.premarket_open(),
                    tz: params.tz(),
                })?;

        Ok(Self {
            open_time,
            close_time: None,
            is_open: false,
            time_to_open_secs: 0,
        })
    }

    pub fn open_time(&self) -> DateTime<Tz> {
        self.open_time
    }

    /// Regular session close. `None` after a reset.
    pub fn close_time(&self) -> Option<DateTime<Tz>> {
        self.close_time
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Whole seconds (truncated) until the open. Zero unless the open lies ahead.
    pub fn time_to_open_secs(&self) -> i64 {
        self.time_to_open_secs
    }

    pub fn is_reset(&self) -> bool {
        self.close_time.is_none()
    }

    /// Phase at `now`. An open session within `lead` of its close is approaching close.
    pub fn phase(&self, now: DateTime<Utc>, lead: Duration) -> SessionPhase {
        match self.close_time {
            Some(close) if self.is_open => {
                let lead = chrono::Duration::from_std(lead).unwrap_or(chrono::Duration::MAX);
                if close.with_timezone(&Utc) - now <= lead {
                    SessionPhase::ApproachingClose
                } else {
                    SessionPhase::Open
                }
            }
            Some(_) if self.time_to_open_secs > 0 => SessionPhase::PreOpen,
            _ => SessionPhase::Closed,
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let close = self
            .close_time
            .map(|close| close.to_rfc3339())
            .unwrap_or_else(|| "none".to_string());

        write!(
            f,
            "open={} close={} is_open={} time_to_open={}s",
            self.open_time.to_rfc3339(),
            close,
            self.is_open,
            self.time_to_open_secs
        )
    }
}

/// Pulls today's calendar entry and evaluates the [`Session`] against it.
pub struct SessionTracker {
    trading: TradingClient,
    params: SessionParams,
}

impl SessionTracker {
    pub fn new(trading: TradingClient, params: SessionParams) -> Self {
        Self { trading, params }
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Evaluates the session at the current wall-clock time.
    pub async fn refresh(&self) -> Result<Session> {
        self.refresh_at(Utc::now()).await
    }

    /// Evaluates the session at `now`, querying the calendar for the UTC date of `now`.
    ///
    /// Calendar failures are not retried.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> Result<Session> {
        let today = now.date_naive();

        let days = self.trading.calendar(Some(today), today).await?;
        let day = days.iter().find(|day| day.date() == today);

        let session = Session::evaluate(now, day, &self.params)?;

        tracing::debug!("session refreshed: {session}");

        Ok(session)
    }
}
