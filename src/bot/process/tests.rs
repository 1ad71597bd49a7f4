use std::collections::BTreeSet;

use chrono::TimeZone;
use chrono_tz::US::Eastern;

use crate::{
    api::{
        rest::models::{ClosePositionResult, RawBar},
        websocket::error::WebSocketApiError,
    },
    bot::BotConfig,
    scan::error::ScanError,
    testing::{
        BotFixture, MockTrading, StreamCall, TradingCall, asset, bar, eastern, march_2025_calendar,
        next_liquidation, wait_for_phase,
    },
};

use super::*;

fn symbols(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn trading(calendar_days: &[u32]) -> MockTrading {
    MockTrading {
        assets: vec![asset("SIRI", true), asset("PLUG", true), asset("XYZW", false)],
        calendar: march_2025_calendar(calendar_days),
        ..Default::default()
    }
}

fn bars() -> Vec<RawBar> {
    vec![
        bar("SIRI", eastern(2025, 3, 10, 0, 0), 10.),
        // Above the price band
        bar("PLUG", eastern(2025, 3, 10, 0, 0), 25.),
    ]
}

/// Wednesday morning of a regular session.
fn session_morning() -> DateTime<Utc> {
    eastern(2025, 3, 12, 10, 0)
}

#[test]
fn test_liquidation_wait() {
    let close = Eastern.with_ymd_and_hms(2025, 3, 12, 16, 0, 0).unwrap();
    let lead = Duration::from_secs(1_800);

    assert_eq!(
        liquidation_wait(eastern(2025, 3, 12, 10, 0), close, lead),
        Duration::from_secs(19_800)
    );
    // Within the lead time
    assert_eq!(
        liquidation_wait(eastern(2025, 3, 12, 15, 45), close, lead),
        Duration::ZERO
    );
    // After the close
    assert_eq!(
        liquidation_wait(eastern(2025, 3, 12, 17, 0), close, lead),
        Duration::ZERO
    );
    assert_eq!(
        liquidation_wait(eastern(2025, 3, 12, 15, 30), close, lead),
        Duration::ZERO
    );
}

#[tokio::test(start_paused = true)]
async fn test_cycle_liquidates_before_close() {
    let fixture = BotFixture::new(
        session_morning(),
        trading(&[5, 6, 7, 10, 11, 12]),
        bars(),
        true,
    );
    let controller = fixture.bot(BotConfig::default()).start();
    let mut update_rx = controller.update_receiver();

    let results = next_liquidation(&mut update_rx).await;

    assert_eq!(results, vec![ClosePositionResult::new("SIRI", 200)]);
    let liquidated_at = fixture.clock.now();
    assert!(liquidated_at >= eastern(2025, 3, 12, 15, 30));
    assert!(liquidated_at < eastern(2025, 3, 12, 16, 0));

    controller.request_exit();
    let status = controller.until_stopped().await;

    assert!(matches!(status, BotStatus::Shutdown));
    assert_eq!(fixture.close_all_calls(), 1);
    assert!(fixture.trading.calls().contains(&TradingCall::CloseAll(true)));
    assert_eq!(
        fixture.stream.calls(),
        vec![
            StreamCall::Subscribe(symbols(&["SIRI"])),
            StreamCall::Unsubscribe(symbols(&["SIRI"])),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cycle_one_liquidation_per_session() {
    let fixture = BotFixture::new(
        session_morning(),
        trading(&[5, 6, 7, 10, 11, 12]),
        bars(),
        true,
    );
    let controller = fixture.bot(BotConfig::default()).start();
    let mut update_rx = controller.update_receiver();

    next_liquidation(&mut update_rx).await;

    // Second iteration evaluates the session after the close and idles until the next
    // premarket open
    wait_for_phase(&mut update_rx, CyclePhase::Unsubscribed).await;
    wait_for_phase(&mut update_rx, CyclePhase::Idle).await;
    wait_for_phase(&mut update_rx, CyclePhase::FetchingUniverse).await;
    wait_for_phase(&mut update_rx, CyclePhase::Idle).await;

    assert_eq!(fixture.close_all_calls(), 1);

    controller.request_exit();
    assert!(matches!(
        controller.until_stopped().await,
        BotStatus::Shutdown
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cycle_without_session_close_skips_liquidation() {
    // No calendar entry for the 12th
    let fixture = BotFixture::new(
        session_morning(),
        trading(&[4, 5, 6, 7, 10, 11]),
        bars(),
        true,
    );
    let controller = fixture.bot(BotConfig::default()).start();
    let mut update_rx = controller.update_receiver();

    let session = loop {
        if let BotUpdate::Session(session) = update_rx.recv().await.unwrap() {
            break session;
        }
    };
    assert!(session.is_reset());
    assert_eq!(
        session.open_time(),
        Eastern.with_ymd_and_hms(2025, 3, 13, 4, 0, 0).unwrap()
    );

    wait_for_phase(&mut update_rx, CyclePhase::Idle).await;

    assert_eq!(fixture.close_all_calls(), 0);
    assert_eq!(
        fixture.stream.calls(),
        vec![
            StreamCall::Subscribe(symbols(&["SIRI"])),
            StreamCall::Unsubscribe(symbols(&["SIRI"])),
        ]
    );

    controller.request_exit();
    assert!(matches!(
        controller.until_stopped().await,
        BotStatus::Shutdown
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cycle_empty_symbol_set_skips_subscription() {
    let fixture = BotFixture::new(
        session_morning(),
        trading(&[5, 6, 7, 10, 11, 12]),
        vec![bar("PLUG", eastern(2025, 3, 10, 0, 0), 25.)],
        false,
    );
    let controller = fixture.bot(BotConfig::default()).start();
    let mut update_rx = controller.update_receiver();

    next_liquidation(&mut update_rx).await;

    assert!(fixture.stream.calls().is_empty());

    controller.request_exit();
    assert!(matches!(
        controller.until_stopped().await,
        BotStatus::Shutdown
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cycle_defers_subscription_until_connected() {
    let fixture = BotFixture::new(
        session_morning(),
        trading(&[5, 6, 7, 10, 11, 12]),
        bars(),
        false,
    );
    let controller = fixture.bot(BotConfig::default()).start();
    let mut update_rx = controller.update_receiver();

    time::sleep(Duration::from_secs(5)).await;
    assert!(fixture.stream.calls().is_empty());
    fixture.stream.set_connected(true);

    next_liquidation(&mut update_rx).await;

    assert_eq!(
        fixture.stream.calls()[0],
        StreamCall::Subscribe(symbols(&["SIRI"]))
    );

    controller.request_exit();
    assert!(matches!(
        controller.until_stopped().await,
        BotStatus::Shutdown
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cycle_survives_long_stream_outage() {
    let fixture = BotFixture::new(
        session_morning(),
        trading(&[5, 6, 7, 10, 11, 12]),
        bars(),
        false,
    );
    let controller = fixture.bot(BotConfig::default()).start();
    let mut update_rx = controller.update_receiver();

    time::sleep(Duration::from_secs(90)).await;

    let status = controller.status_snapshot();
    assert!(
        matches!(status, BotStatus::Running(CyclePhase::Waiting)),
        "unexpected status {status}"
    );
    assert!(fixture.stream.calls().is_empty());

    fixture.stream.set_connected(true);

    // The cycle ran without a subscription and still liquidates before the close
    let results = next_liquidation(&mut update_rx).await;
    assert_eq!(results, vec![ClosePositionResult::new("SIRI", 200)]);
    assert!(fixture.clock.now() < eastern(2025, 3, 12, 16, 0));
    assert!(fixture.stream.calls().is_empty());

    controller.request_exit();
    assert!(matches!(
        controller.until_stopped().await,
        BotStatus::Shutdown
    ));
}

#[tokio::test(start_paused = true)]
async fn test_exit_interrupts_subscription_deferral() {
    let fixture = BotFixture::new(
        session_morning(),
        trading(&[5, 6, 7, 10, 11, 12]),
        bars(),
        false,
    );
    let controller = fixture.bot(BotConfig::default()).start();

    time::sleep(Duration::from_secs(5)).await;
    controller.request_exit();

    let status = time::timeout(Duration::from_secs(5), controller.until_stopped())
        .await
        .expect("deferral should stop on exit");

    assert!(matches!(status, BotStatus::Shutdown));
    assert_eq!(fixture.close_all_calls(), 0);
    assert!(fixture.stream.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_cancels_cycle() {
    let fixture = BotFixture::new(
        session_morning(),
        trading(&[5, 6, 7, 10, 11, 12]),
        bars(),
        true,
    );
    let controller = fixture.bot(BotConfig::default()).start();
    let mut update_rx = controller.update_receiver();

    wait_for_phase(&mut update_rx, CyclePhase::Waiting).await;
    fixture.stream.fail();

    let status = controller.until_stopped().await;

    let BotStatus::Terminated(e) = &status else {
        panic!("expected terminated status, got {status}");
    };
    assert!(matches!(
        e.as_ref(),
        BotProcessError::Transport(WebSocketApiError::ServerRequestedClose)
    ));

    // The aborted cycle task releases its clients
    for _ in 0..10 {
        if Arc::strong_count(&fixture.trading) == 1 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(Arc::strong_count(&fixture.trading), 1);
    assert_eq!(fixture.close_all_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_liquidation_failure_terminates() {
    let fixture = BotFixture::new(
        session_morning(),
        MockTrading {
            fail_close: true,
            ..trading(&[5, 6, 7, 10, 11, 12])
        },
        bars(),
        true,
    );
    let controller = fixture.bot(BotConfig::default()).start();

    let status = controller.until_stopped().await;

    let BotStatus::Terminated(e) = &status else {
        panic!("expected terminated status, got {status}");
    };
    assert!(matches!(e.as_ref(), BotProcessError::Liquidation(_)));
}

#[tokio::test(start_paused = true)]
async fn test_scan_failure_terminates() {
    let fixture = BotFixture::new(
        session_morning(),
        MockTrading {
            fail_calendar: true,
            ..trading(&[5, 6, 7, 10, 11, 12])
        },
        bars(),
        true,
    );
    let controller = fixture.bot(BotConfig::default()).start();

    let status = controller.until_stopped().await;

    let BotStatus::Terminated(e) = &status else {
        panic!("expected terminated status, got {status}");
    };
    assert!(matches!(
        e.as_ref(),
        BotProcessError::Scan(ScanError::RestApi(_))
    ));
    assert!(fixture.stream.calls().is_empty());
}
