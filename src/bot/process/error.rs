use std::result;

use thiserror::Error;
use tokio::task::JoinError;

use crate::{
    api::{rest::error::RestApiError, websocket::error::WebSocketApiError},
    scan::error::ScanError,
    session::error::SessionError,
};

use super::super::subscription::error::SubscriptionError;

#[derive(Error, Debug)]
pub enum BotProcessError {
    #[error("[Scan] {0}")]
    Scan(#[from] ScanError),

    #[error("[Session] {0}")]
    Session(#[from] SessionError),

    #[error("[Subscription] {0}")]
    Subscription(#[from] SubscriptionError),

    #[error("Liquidation failed: {0}")]
    Liquidation(RestApiError),

    #[error("Transport terminated: {0}")]
    Transport(WebSocketApiError),

    #[error("[TransportTaskJoin] {0}")]
    TransportTaskJoin(JoinError),

    #[error("[CycleTaskJoin] {0}")]
    CycleTaskJoin(JoinError),

    #[error("[ProcessTaskJoin] {0}")]
    ProcessTaskJoin(JoinError),

    #[error("Bot shutdown process timeout error")]
    ShutdownTimeout,

    #[error("Bot process was aborted")]
    Aborted,
}

pub(crate) type Result<T> = result::Result<T, BotProcessError>;
