use std::sync::Arc;

pub(crate) mod alpaca;
pub(crate) mod backoff;
pub(crate) mod error;
pub(crate) mod models;
pub(crate) mod repositories;
pub(crate) mod state;

use repositories::{DataStreamRepository, TradeUpdateRepository};

/// Thread-safe handle to a [`DataStreamRepository`].
pub type DataStreamClient = Arc<dyn DataStreamRepository>;

/// Thread-safe handle to a [`TradeUpdateRepository`].
pub type TradeUpdateClient = Arc<dyn TradeUpdateRepository>;
