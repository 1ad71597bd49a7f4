use std::{result, sync::Arc};

use thiserror::Error;

use crate::api::rest::error::RestApiError;

use super::{process::error::BotProcessError, state::BotStatus};

#[derive(Error, Debug)]
pub enum BotError {
    #[error("[RestApiInit] {0}")]
    RestApiInit(RestApiError),

    #[error("Bot was already shutdown")]
    AlreadyShutdown,

    #[error("Bot already terminated with status: {0}")]
    AlreadyTerminated(BotStatus),

    #[error("Bot shutdown failed: {0}")]
    ShutdownFailed(Arc<BotProcessError>),
}

pub(crate) type Result<T> = result::Result<T, BotError>;
