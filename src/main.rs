use std::{env, error::Error, sync::Arc};

use dotenv::dotenv;

use premarket_perk::{
    api::Credentials,
    bot::{BotConfig, BotStatus, TradingBot, TradingBotController},
    logging,
};

const DEFAULT_LOG_FILE: &str = "premarket-perk.txt";
const DEFAULT_LOG_FILTER: &str = "info";

/// First Ctrl-C requests a graceful exit, a second one aborts.
fn spawn_signal_handler(controller: Arc<TradingBotController>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        controller.request_exit();

        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("second interrupt received, aborting");
        controller.abort();
    });
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    let log_file = env::var("LOG_FILE").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

    logging::init(&log_file, &log_filter)?;

    let credentials = Credentials::from_env()?;

    let bot = TradingBot::with_alpaca(BotConfig::default(), credentials)?;
    let controller = bot.start();

    spawn_signal_handler(controller.clone());

    match controller.until_stopped().await {
        BotStatus::Terminated(e) => {
            tracing::error!("bot terminated: {e}");
            Err(e.into())
        }
        status => {
            tracing::info!("bot stopped: {status}");
            Ok(())
        }
    }
}
