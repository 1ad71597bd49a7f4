use std::result;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use tokio::task::JoinError;

use crate::api::rest::error::RestApiError;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("[RestApi] {0}")]
    RestApi(#[from] RestApiError),

    #[error("Calendar returned {found} sessions, at least {required} are needed")]
    InsufficientCalendar { found: usize, required: usize },

    #[error("Calendar time {date} {time} does not exist in the exchange time zone")]
    InvalidLocalTime { date: NaiveDate, time: NaiveTime },

    #[error("[CleanTaskJoin] {0}")]
    CleanTaskJoin(JoinError),
}

pub(crate) type Result<T> = result::Result<T, ScanError>;
