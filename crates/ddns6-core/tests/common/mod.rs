//! Test doubles and common utilities for engine contract tests
//!
//! All doubles run against tokio's clock, so tests use
//! `#[tokio::test(start_paused = true)]` and whole timelines complete instantly.

#![allow(dead_code)]

use ddns6_core::error::{Error, Result};
use ddns6_core::traits::{DnsProvider, ExistingRecord, IpSource, RecordId, RecordSpec};
use ddns6_core::{DdnsConfig, DdnsEngine, EngineEvent, ProviderConfig};
use std::collections::VecDeque;
use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

pub const ADDR_A: &str = "2001:db8::a";
pub const ADDR_B: &str = "2001:db8::b";
pub const ADDR_C: &str = "2001:db8::c";

pub fn ip(s: &str) -> Ipv6Addr {
    s.parse().expect("valid IPv6 literal")
}

pub fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// What the interface reports from a given offset on
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Addr(Ipv6Addr),
    /// Reading the interface fails
    Fail,
}

/// An IpSource whose answer follows a timeline
///
/// Offsets are measured from construction. The last step whose offset has
/// been reached wins.
#[derive(Clone)]
pub struct ScriptedIpSource {
    origin: Instant,
    steps: Arc<Vec<(Duration, Step)>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn new(steps: Vec<(Duration, Step)>) -> Self {
        Self {
            origin: Instant::now(),
            steps: Arc::new(steps),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// An interface that always reports `address`
    pub fn fixed(address: &str) -> Self {
        Self::new(vec![(Duration::ZERO, Step::Addr(ip(address)))])
    }

    /// Get the number of times current() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<Ipv6Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let elapsed = self.origin.elapsed();
        let step = self
            .steps
            .iter()
            .take_while(|(offset, _)| *offset <= elapsed)
            .last()
            .map(|(_, step)| *step);

        match step {
            Some(Step::Addr(address)) => Ok(address),
            Some(Step::Fail) | None => Err(Error::interface_not_found("eth0")),
        }
    }

    fn interface(&self) -> &str {
        "eth0"
    }
}

/// One recorded upsert call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertCall {
    pub record_id: Option<RecordId>,
    pub address: Ipv6Addr,
    /// Offset from the provider's construction
    pub at: Duration,
}

/// A DnsProvider that records calls and answers from a script
///
/// Clones share state, so a test keeps one handle and gives the engine
/// another.
#[derive(Clone)]
pub struct MockDnsProvider {
    origin: Instant,
    existing: Option<ExistingRecord>,
    fetch_error: Option<String>,
    /// `Err(msg)` entries fail with `Error::Api(msg)`; when empty, upserts
    /// succeed
    upsert_results: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
    upsert_delay: Duration,
    fetch_call_count: Arc<AtomicUsize>,
    upsert_calls: Arc<Mutex<Vec<UpsertCall>>>,
}

impl MockDnsProvider {
    /// A provider with no published record
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            existing: None,
            fetch_error: None,
            upsert_results: Arc::new(Mutex::new(VecDeque::new())),
            upsert_delay: Duration::ZERO,
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            upsert_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A provider already holding a record
    pub fn with_existing(id: &str, content: &str) -> Self {
        Self {
            existing: Some(ExistingRecord {
                id: RecordId::new(id),
                content: content.to_string(),
            }),
            ..Self::new()
        }
    }

    /// Make the startup lookup fail with an API error
    pub fn failing_lookup(msg: &str) -> Self {
        Self {
            fetch_error: Some(msg.to_string()),
            ..Self::new()
        }
    }

    /// Queue the outcome of the next upsert
    pub fn push_upsert_result(&self, result: std::result::Result<&str, &str>) {
        self.upsert_results
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string).map_err(str::to_string));
    }

    /// Make every upsert take `delay` before answering
    pub fn with_upsert_delay(mut self, delay: Duration) -> Self {
        self.upsert_delay = delay;
        self
    }

    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> Vec<UpsertCall> {
        self.upsert_calls.lock().unwrap().clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.upsert_calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn fetch_existing(&self, _record: &RecordSpec) -> Result<Option<ExistingRecord>> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);

        match &self.fetch_error {
            Some(msg) => Err(Error::api(msg.clone())),
            None => Ok(self.existing.clone()),
        }
    }

    async fn upsert(
        &self,
        _record: &RecordSpec,
        record_id: Option<&RecordId>,
        address: Ipv6Addr,
    ) -> Result<RecordId> {
        self.upsert_calls.lock().unwrap().push(UpsertCall {
            record_id: record_id.cloned(),
            address,
            at: self.origin.elapsed(),
        });

        if !self.upsert_delay.is_zero() {
            tokio::time::sleep(self.upsert_delay).await;
        }

        let scripted = self.upsert_results.lock().unwrap().pop_front();
        match scripted {
            Some(Ok(id)) => Ok(RecordId::new(id)),
            Some(Err(msg)) => Err(Error::api(msg)),
            None => Ok(record_id
                .cloned()
                .unwrap_or_else(|| RecordId::new("rec-new"))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A valid configuration with the given timings
pub fn config_with_timings(poll_interval: u64, stability_delay: u64) -> DdnsConfig {
    let mut config = DdnsConfig::new(
        "eth0",
        ProviderConfig::new("test-token", "zone-123", "home.example.com"),
    );
    config.poll_interval = poll_interval;
    config.stability_delay = stability_delay;
    config
}

/// Poll every 2 s, require 5 s of stability
pub fn fast_config() -> DdnsConfig {
    config_with_timings(2, 5)
}

/// Build an engine from the doubles; panics on invalid config
pub fn engine_with(
    ip_source: &ScriptedIpSource,
    provider: &MockDnsProvider,
    config: &DdnsConfig,
) -> (DdnsEngine, mpsc::Receiver<EngineEvent>) {
    DdnsEngine::new(Box::new(ip_source.clone()), Box::new(provider.clone()), config)
        .expect("engine construction succeeds")
}

/// Run the engine for `duration` of (virtual) time, then shut it down
///
/// Returns the engine so tests can inspect its final state.
pub async fn run_for(mut engine: DdnsEngine, duration: Duration) -> (DdnsEngine, Result<()>) {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let result = engine.run_with_shutdown(shutdown_rx).await;
        (engine, result)
    });

    tokio::time::sleep(duration).await;
    let _ = shutdown_tx.send(());

    handle.await.expect("engine task panicked")
}

/// Collect every event emitted so far
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Assert a recorded offset matches the expected one, within timer granularity
pub fn assert_near(actual: Duration, expected: Duration) {
    let tolerance = millis(50);
    assert!(
        actual >= expected && actual <= expected + tolerance,
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}
