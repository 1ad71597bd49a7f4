pub mod api;
pub mod bot;
pub mod logging;
pub(crate) mod scan;
pub mod session;
pub(crate) mod shared;
pub(crate) mod util;

#[cfg(test)]
pub(crate) mod testing;

pub mod error {
    pub use super::api::{
        error::ConfigError, rest::error::RestApiError, websocket::error::WebSocketApiError,
    };
    pub use super::bot::{
        error::BotError, process::error::BotProcessError, subscription::error::SubscriptionError,
    };
    pub use super::logging::error::LoggingError;
    pub use super::scan::error::ScanError;
    pub use super::session::error::SessionError;
    pub use super::shared::error::{PercentChangeValidationError, PriceBandValidationError};
}

pub mod models {
    pub use super::scan::{BarField, HistoricalTable, OhlcBar};
    pub use super::session::{Session, SessionParams, SessionPhase};
    pub use super::shared::{PercentChange, PriceBand};
}

pub use util::Never;
