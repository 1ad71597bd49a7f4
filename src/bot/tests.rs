use std::{sync::Arc, time::Duration};

use chrono::NaiveTime;
use chrono_tz::US::Pacific;

use crate::{
    api::{ApiClientConfig, DataFeed},
    scan::ScannerConfig,
    session::SessionParams,
    testing::{
        BotFixture, MockTrading, asset, bar, eastern, march_2025_calendar, next_liquidation,
        wait_for_phase,
    },
};

use super::{error::BotError, process::error::BotProcessError, *};

fn fixture(fail_calendar: bool) -> BotFixture {
    BotFixture::new(
        eastern(2025, 3, 12, 10, 0),
        MockTrading {
            assets: vec![asset("SIRI", true)],
            calendar: march_2025_calendar(&[5, 6, 7, 10, 11, 12]),
            fail_calendar,
            ..Default::default()
        },
        vec![bar("SIRI", eastern(2025, 3, 10, 0, 0), 4.)],
        true,
    )
}

#[test]
fn test_config_defaults() {
    let config = BotConfig::default();

    assert_eq!(config.min_premarket_percent_change().as_f64(), 30.);
    assert_eq!(config.liquidation_lead(), Duration::from_secs(1_800));
    assert_eq!(config.session_cutoff(), NaiveTime::from_hms_opt(16, 0, 0).unwrap());
    assert_eq!(config.premarket_open(), NaiveTime::from_hms_opt(4, 0, 0).unwrap());
    assert_eq!(config.price_band().lower(), 0.8);
    assert_eq!(config.price_band().upper(), 20.);
    assert!(config.paper());
}

#[test]
fn test_config_conversions() {
    let config = BotConfig::default()
        .with_tz(Pacific)
        .with_paper(false)
        .with_data_feed(DataFeed::Iex)
        .with_ws_reconnect_backoff(2, 1);

    let api = ApiClientConfig::from(&config);
    assert!(!api.paper());
    assert_eq!(api.data_feed(), DataFeed::Iex);
    assert_eq!(api.ws_reconnect_min_backoff(), Duration::from_secs(2));
    assert_eq!(api.ws_reconnect_max_backoff(), Duration::from_secs(2));

    let scanner = ScannerConfig::from(&config);
    assert_eq!(scanner.tz, Pacific);
    assert_eq!(scanner.data_feed, DataFeed::Iex);

    let params = SessionParams::from(&config);
    assert_eq!(params.tz(), Pacific);
    assert_eq!(params.premarket_open(), config.premarket_open());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_idle() {
    let fixture = fixture(false);
    let controller = fixture.bot(BotConfig::default()).start();
    let mut update_rx = controller.update_receiver();

    next_liquidation(&mut update_rx).await;

    controller.shutdown().await.unwrap();

    assert!(matches!(controller.status_snapshot(), BotStatus::Shutdown));
    assert!(matches!(
        controller.shutdown().await,
        Err(BotError::AlreadyShutdown)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_times_out_while_waiting_for_close() {
    let fixture = fixture(false);
    let controller = fixture
        .bot(BotConfig::default().with_shutdown_timeout(6))
        .start();
    let mut update_rx = controller.update_receiver();

    wait_for_phase(&mut update_rx, CyclePhase::Waiting).await;

    let err = controller.shutdown().await.unwrap_err();

    let BotError::ShutdownFailed(e) = &err else {
        panic!("expected shutdown failure, got {err}");
    };
    assert!(matches!(e.as_ref(), BotProcessError::ShutdownTimeout));
    assert!(matches!(
        controller.status_snapshot(),
        BotStatus::Terminated(_)
    ));
    assert_eq!(fixture.close_all_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_after_termination() {
    let fixture = fixture(true);
    let controller = fixture.bot(BotConfig::default()).start();

    let status = controller.until_stopped().await;
    assert!(matches!(status, BotStatus::Terminated(_)));

    assert!(matches!(
        controller.shutdown().await,
        Err(BotError::AlreadyTerminated(BotStatus::Terminated(_)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_abort() {
    let fixture = fixture(false);
    let controller = fixture.bot(BotConfig::default()).start();
    let mut update_rx = controller.update_receiver();

    wait_for_phase(&mut update_rx, CyclePhase::Waiting).await;

    controller.abort();

    let status = controller.until_stopped().await;
    let BotStatus::Terminated(e) = &status else {
        panic!("expected terminated status, got {status}");
    };
    assert!(matches!(e.as_ref(), BotProcessError::Aborted));

    for _ in 0..10 {
        if Arc::strong_count(&fixture.trading) == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(Arc::strong_count(&fixture.trading), 1);
}
