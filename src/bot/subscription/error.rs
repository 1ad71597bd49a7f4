use std::{result, sync::Arc};

use thiserror::Error;

use crate::api::websocket::{error::WebSocketApiError, state::WsConnectionStatus};

#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("Data stream is not connected, status: {0}")]
    NotConnected(Arc<WsConnectionStatus>),

    #[error("[Stream] {0}")]
    Stream(WebSocketApiError),
}

impl SubscriptionError {
    /// Returns `true` if the call can be retried once the stream reconnects.
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected(_))
    }
}

impl From<WebSocketApiError> for SubscriptionError {
    fn from(value: WebSocketApiError) -> Self {
        match value {
            WebSocketApiError::NotConnected(status) => Self::NotConnected(status),
            e => Self::Stream(e),
        }
    }
}

pub(crate) type Result<T> = result::Result<T, SubscriptionError>;
