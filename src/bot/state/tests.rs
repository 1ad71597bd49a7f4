use std::time::Duration;

use chrono_tz::US::Eastern;

use crate::testing::{bar, eastern};

use super::*;

fn table(bars: Vec<crate::api::rest::models::RawBar>) -> HistoricalTable {
    HistoricalTable::clean(
        bars,
        &Eastern,
        chrono::NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        &crate::shared::PriceBand::default(),
    )
}

#[test]
fn test_threshold_from_initial_price() {
    let watch = SymbolWatch::new("SIRI", 10., PercentChange::default());

    assert_eq!(watch.initial_price(), 10.);
    assert!((watch.threshold_price() - 13.).abs() < 1e-9);
    assert!(watch.consolidated_bars().is_empty());
}

#[test]
fn test_reset_watches_uses_most_recent_close() {
    let mut state = BotState::new(ExitFlag::new(), PercentChange::default());
    let recent = table(vec![
        bar("SIRI", eastern(2024, 3, 7, 0, 0), 4.),
        bar("SIRI", eastern(2024, 3, 8, 0, 0), 10.),
        bar("PLUG", eastern(2024, 3, 8, 0, 0), 2.),
    ]);

    let symbols = state.reset_watches(&recent);

    assert_eq!(
        symbols,
        BTreeSet::from(["PLUG".to_string(), "SIRI".to_string()])
    );
    assert_eq!(state.watches()["SIRI"].initial_price(), 10.);
    assert!((state.thresholds()["SIRI"] - 13.).abs() < 1e-9);
    assert!((state.thresholds()["PLUG"] - 2.6).abs() < 1e-9);
}

#[test]
fn test_reset_watches_clears_previous_cycle() {
    let mut state = BotState::new(ExitFlag::new(), PercentChange::default());
    state.reset_watches(&table(vec![bar("SIRI", eastern(2024, 3, 8, 0, 0), 4.)]));
    state
        .watches
        .get_mut("SIRI")
        .unwrap()
        .push_bar(OhlcBar {
            open: 4.,
            high: 4.5,
            low: 3.9,
            close: 4.4,
        });

    let symbols = state.reset_watches(&table(vec![bar("PLUG", eastern(2024, 3, 11, 0, 0), 2.)]));

    assert_eq!(symbols, BTreeSet::from(["PLUG".to_string()]));
    assert!(!state.watches().contains_key("SIRI"));
    assert!(state.watches()["PLUG"].consolidated_bars().is_empty());
}

#[test]
fn test_reset_watches_empty_table() {
    let mut state = BotState::new(ExitFlag::new(), PercentChange::default());

    let symbols = state.reset_watches(&HistoricalTable::default());

    assert!(symbols.is_empty());
    assert!(state.thresholds().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_exit_flag_wakes_waiter() {
    let exit = ExitFlag::new();

    let waiter = tokio::spawn({
        let exit = exit.clone();
        async move { exit.requested().await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!waiter.is_finished());

    exit.request();

    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should complete")
        .unwrap();
    assert!(exit.is_requested());

    // Already requested
    exit.requested().await;
}

#[test]
fn test_status_manager_ignores_phases_during_shutdown() {
    let (update_tx, _) = broadcast::channel(16);
    let manager = BotStatusManager::new(update_tx);
    let mut rx = manager.update_receiver();

    manager.update_phase(CyclePhase::Waiting);
    manager.update(BotStatus::ShutdownInitiated);
    manager.update_phase(CyclePhase::Liquidating);

    assert!(matches!(
        manager.status_snapshot(),
        BotStatus::ShutdownInitiated
    ));
    assert!(matches!(
        rx.try_recv(),
        Ok(BotUpdate::Status(BotStatus::Running(CyclePhase::Waiting)))
    ));
    assert!(matches!(
        rx.try_recv(),
        Ok(BotUpdate::Status(BotStatus::ShutdownInitiated))
    ));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_status_display() {
    assert_eq!(
        BotStatus::Running(CyclePhase::Waiting).to_string(),
        "Running (Waiting for liquidation)"
    );
    assert!(BotStatus::Shutdown.is_stopped());
    assert!(!BotStatus::Running(CyclePhase::Idle).is_stopped());
}
