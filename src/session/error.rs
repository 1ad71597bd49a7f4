use std::result;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use thiserror::Error;

use crate::api::rest::error::RestApiError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("[Calendar] {0}")]
    Calendar(#[from] RestApiError),

    #[error("Local time {date} {time} does not exist in {tz}")]
    InvalidLocalTime {
        date: NaiveDate,
        time: NaiveTime,
        tz: Tz,
    },
}

pub(crate) type Result<T> = result::Result<T, SessionError>;
