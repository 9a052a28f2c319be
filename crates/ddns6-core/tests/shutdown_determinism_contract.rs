//! Contract Test: Shutdown Determinism
//!
//! Shutdown stops polling and cancels the stability timer, so no DNS write
//! happens afterwards.
//!
//! Constraints verified:
//! - A pending candidate is dropped, never written
//! - Dropping the shutdown sender also stops the engine
//! - A write already in flight completes before the engine returns
//! - shutdown() is idempotent

mod common;

use common::*;
use ddns6_core::EngineEvent;
use tokio::sync::oneshot;

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_update() {
    let ip_source = ScriptedIpSource::new(vec![
        (secs(0), Step::Addr(ip(ADDR_A))),
        (secs(3), Step::Addr(ip(ADDR_B))),
    ]);
    let provider = MockDnsProvider::with_existing("rec-1", ADDR_A);
    let (engine, mut events) = engine_with(&ip_source, &provider, &fast_config());

    // B pending since t=4 (deadline 9); stop at t=6
    let (engine, result) = run_for(engine, millis(6_500)).await;
    result.expect("engine runs cleanly");
    assert_eq!(engine.pending(), None, "shutdown must cancel the timer");

    // Nothing fires after the engine returned
    tokio::time::sleep(secs(30)).await;
    assert_eq!(provider.upsert_count(), 0);
    assert_eq!(engine.last_confirmed(), Some(ip(ADDR_A)));

    let events = drain_events(&mut events);
    assert!(matches!(
        events.last(),
        Some(EngineEvent::Stopped { reason }) if reason == "shutdown requested"
    ));
}

#[tokio::test(start_paused = true)]
async fn dropped_sender_stops_engine() {
    let ip_source = ScriptedIpSource::fixed(ADDR_A);
    let provider = MockDnsProvider::with_existing("rec-1", ADDR_A);
    let (mut engine, _events) = engine_with(&ip_source, &provider, &fast_config());

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    drop(shutdown_tx);

    let result = tokio::time::timeout(secs(5), engine.run_with_shutdown(shutdown_rx)).await;
    assert!(result.is_ok(), "engine should stop when its sender is dropped");
    result.unwrap().expect("engine runs cleanly");
}

#[tokio::test(start_paused = true)]
async fn in_flight_write_completes_before_return() {
    let ip_source = ScriptedIpSource::new(vec![
        (secs(0), Step::Addr(ip(ADDR_A))),
        (secs(3), Step::Addr(ip(ADDR_B))),
    ]);
    let provider = MockDnsProvider::with_existing("rec-1", ADDR_A).with_upsert_delay(secs(10));
    let (engine, _events) = engine_with(&ip_source, &provider, &fast_config());

    // Write starts at t=9 and takes until t=19; stop requested at t=10
    let (engine, result) = tokio::time::timeout(secs(60), run_for(engine, secs(10)))
        .await
        .expect("engine should terminate after the in-flight write");
    result.expect("engine runs cleanly");

    assert_eq!(provider.upsert_count(), 1);
    assert_eq!(engine.last_confirmed(), Some(ip(ADDR_B)));
    assert_eq!(engine.pending(), None);
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_idempotent() {
    let ip_source = ScriptedIpSource::fixed(ADDR_A);
    let provider = MockDnsProvider::with_existing("rec-1", ADDR_A);
    let (engine, mut events) = engine_with(&ip_source, &provider, &fast_config());

    let (mut engine, result) = run_for(engine, millis(1_500)).await;
    result.expect("engine runs cleanly");

    engine.shutdown("again");
    engine.shutdown("and again");

    let stopped = drain_events(&mut events)
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::Stopped { .. }))
        .count();
    assert_eq!(stopped, 1);
}

#[tokio::test(start_paused = true)]
async fn second_run_shuts_down_again() {
    let ip_source = ScriptedIpSource::fixed(ADDR_B);
    let provider = MockDnsProvider::with_existing("rec-1", ADDR_A);
    let (engine, mut events) = engine_with(&ip_source, &provider, &fast_config());

    let (engine, result) = run_for(engine, millis(1_500)).await;
    result.expect("first run ends cleanly");
    assert_eq!(engine.pending(), None);

    // B is a candidate again in the second run; its shutdown must drop it
    let (engine, result) = run_for(engine, millis(1_500)).await;
    result.expect("second run ends cleanly");
    assert_eq!(engine.pending(), None);

    tokio::time::sleep(secs(30)).await;
    assert_eq!(provider.upsert_count(), 0);

    let stopped = drain_events(&mut events)
        .into_iter()
        .filter(|e| matches!(e, EngineEvent::Stopped { .. }))
        .count();
    assert_eq!(stopped, 2);
}
