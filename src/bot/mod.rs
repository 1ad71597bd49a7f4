//! Premarket trading cycle: universe scan, threshold computation, trade subscriptions and
//! liquidation ahead of the session close, run alongside the stream transport.

pub(crate) mod clock;
mod config;
mod engine;
pub(crate) mod error;
mod handlers;
pub(crate) mod process;
mod state;
pub(crate) mod subscription;

pub use config::BotConfig;
pub use engine::{TradingBot, TradingBotController};
pub use handlers::{LoggingTradeHandler, LoggingTradeUpdateHandler};
pub use state::{BotReceiver, BotStatus, BotUpdate, CyclePhase, SymbolWatch};
pub use subscription::SubscriptionManager;

#[cfg(test)]
mod tests;
