//! Core DDNS engine
//!
//! The DdnsEngine is the poll driver. It is responsible for:
//! - Seeding the confirmed address and record id from the provider at startup
//! - Polling the IpSource at a fixed interval
//! - Feeding results to the debounce state machine
//! - Publishing a candidate via the DnsProvider once it held for the stability window
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   poll tick    ┌──────────────┐  stable address  ┌─────────────┐
//! │  IpSource   │ ─────────────► │  Debouncer   │ ───────────────► │ DnsProvider │
//! └─────────────┘   re-probe     └──────────────┘      upsert      └─────────────┘
//!        ▲                              │
//!        └──────── stability timer ─────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. Startup lookup seeds `last_confirmed` and the record id
//! 2. Each tick probes the interface and feeds the debouncer
//! 3. A new candidate arms the stability timer (replacing any running one)
//! 4. On expiry the interface is probed again; a stable candidate is upserted
//! 5. Events are emitted for monitoring/logging

pub mod debounce;

use crate::config::DdnsConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, IpSource, RecordId, RecordSpec};
use debounce::{Debouncer, Expiry, Observation, Pending};
use std::future::Future;
use std::net::Ipv6Addr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Capacity of the engine event channel
///
/// When full, new events are dropped (with a warning log).
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Startup lookup done, polling begins
    Started {
        interface: String,
        record_name: String,
        last_confirmed: Option<Ipv6Addr>,
    },

    /// Reading the interface failed; state unchanged
    ProbeFailed { error: String },

    /// A new candidate address was seen
    AddressDetected {
        address: Ipv6Addr,
        previous: Option<Ipv6Addr>,
    },

    /// Stability timer armed for a candidate
    StabilityWaitStarted { address: Ipv6Addr, delay: Duration },

    /// Address reverted to the confirmed one before the window elapsed
    PendingCancelled {
        address: Ipv6Addr,
        reverted_to: Ipv6Addr,
    },

    /// Address moved while its window was running
    StabilityWindowMoved { from: Ipv6Addr, to: Ipv6Addr },

    /// Re-probe at timer expiry failed; candidate dropped
    CandidateAbandoned { address: Ipv6Addr, error: String },

    /// DNS record written
    RecordUpdated {
        address: Ipv6Addr,
        previous: Option<Ipv6Addr>,
        record_id: RecordId,
        created: bool,
    },

    /// DNS write failed; confirmed address unchanged
    UpdateFailed { address: Ipv6Addr, error: String },

    /// Engine stopped
    Stopped { reason: String },
}

/// Core DDNS engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run()`] (or [`DdnsEngine::run_with_shutdown()`])
/// 3. Engine performs the startup lookup, then polls until shutdown
///
/// ## Threading
///
/// Poll ticks and stability-timer expiries are handled one at a time on the
/// task running the engine, so the debounce state has a single owner. A
/// DNS write is awaited inline; ticks falling due meanwhile are delayed, not
/// bursted.
pub struct DdnsEngine {
    /// IP source for reading the interface address
    ip_source: Box<dyn IpSource>,

    /// DNS provider for writing the record
    provider: Box<dyn DnsProvider>,

    /// The managed record
    record: RecordSpec,

    /// Interval between polls
    poll_interval: Duration,

    /// Debounce state
    debounce: Debouncer,

    /// Identifier of the remote record, once known
    record_id: Option<RecordId>,

    /// Set once shutdown ran
    stopped: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        config: &DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            ip_source,
            provider,
            record: config.provider.record_spec(),
            poll_interval: config.poll_interval(),
            debounce: Debouncer::new(config.stability_delay()),
            record_id: None,
            stopped: false,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Address last published, or found published at startup
    pub fn last_confirmed(&self) -> Option<Ipv6Addr> {
        self.debounce.last_confirmed()
    }

    /// Candidate currently waiting out its stability window
    pub fn pending(&self) -> Option<Pending> {
        self.debounce.pending()
    }

    /// Cached identifier of the remote record
    pub fn record_id(&self) -> Option<&RecordId> {
        self.record_id.as_ref()
    }

    /// Run the engine until SIGINT or SIGTERM
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Startup lookup or signal setup failed
    pub async fn run(&mut self) -> Result<()> {
        let shutdown = shutdown_signal()?;
        self.run_until(shutdown).await
    }

    /// Run the engine until `shutdown_rx` fires (or its sender is dropped)
    ///
    /// Embedders and tests use this instead of OS signals.
    pub async fn run_with_shutdown(&mut self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.run_until(async move {
            let _ = shutdown_rx.await;
            "shutdown requested"
        })
        .await
    }

    async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = &'static str>,
    {
        self.stopped = false;
        self.bootstrap().await?;

        info!(
            "Starting IPv6 DDNS service for interface {}, updating {}",
            self.ip_source.interface(),
            self.record.name
        );
        self.emit_event(EngineEvent::Started {
            interface: self.ip_source.interface().to_string(),
            record_name: self.record.name.clone(),
            last_confirmed: self.debounce.last_confirmed(),
        });

        // First tick completes immediately: initial check
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        loop {
            let deadline = self.debounce.deadline();

            tokio::select! {
                biased;

                reason = &mut shutdown => {
                    self.shutdown(reason);
                    break;
                }

                _ = stability_timer(deadline) => {
                    self.on_stability_timer().await;
                }

                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }

        Ok(())
    }

    /// Look up the published record once, before polling
    ///
    /// A found record seeds the cached id and the confirmed address, so a
    /// first poll returning the published address causes no DNS write.
    async fn bootstrap(&mut self) -> Result<()> {
        let existing = self.provider.fetch_existing(&self.record).await?;

        let Some(existing) = existing else {
            info!(
                "DNS record {} does not exist, will create on first update",
                self.record.name
            );
            return Ok(());
        };

        match existing.content.parse::<Ipv6Addr>() {
            Ok(address) => {
                info!(
                    "Found existing record {} with IP {} (id: {})",
                    self.record.name, address, existing.id
                );
                self.debounce.seed(address);
            }
            Err(_) => {
                warn!(
                    "Existing record {} has non-IPv6 content '{}', next stable address will overwrite it",
                    self.record.name, existing.content
                );
            }
        }

        self.record_id = Some(existing.id);
        Ok(())
    }

    /// Handle one poll tick
    async fn poll_once(&mut self) {
        let current = match self.ip_source.current().await {
            Ok(address) => address,
            Err(e) => {
                // Pending and confirmed state survive a failed read
                warn!("Error getting IPv6 address: {}", e);
                self.emit_event(EngineEvent::ProbeFailed {
                    error: e.to_string(),
                });
                return;
            }
        };

        match self.debounce.observe(current, Instant::now()) {
            Observation::Unchanged => {
                debug!("Address {} unchanged", current);
            }
            Observation::AlreadyPending { address } => {
                debug!("Still waiting for {} to stabilize", address);
            }
            Observation::Reverted { current, cancelled } => {
                info!(
                    "Address reverted to {}, cancelling pending update to {}",
                    current, cancelled
                );
                self.emit_event(EngineEvent::PendingCancelled {
                    address: cancelled,
                    reverted_to: current,
                });
            }
            Observation::Candidate {
                address,
                previous,
                replaced,
                ..
            } => {
                match previous {
                    Some(previous) => {
                        info!("Detected new IPv6 address: {} (was: {})", address, previous)
                    }
                    None => info!("Detected IPv6 address: {}", address),
                }
                if let Some(replaced) = replaced {
                    debug!("Candidate {} superseded by {}", replaced, address);
                }
                self.emit_event(EngineEvent::AddressDetected { address, previous });
                self.announce_wait(address);
            }
        }
    }

    /// Handle the stability timer firing
    async fn on_stability_timer(&mut self) {
        let mut probe_error = None;
        let reprobed = match self.ip_source.current().await {
            Ok(address) => Some(address),
            Err(e) => {
                warn!("Error verifying IPv6 address: {}", e);
                probe_error = Some(e.to_string());
                None
            }
        };

        match self.debounce.on_timer_expired(reprobed, Instant::now()) {
            Expiry::Idle => {}
            Expiry::Abandoned { address } => {
                // No auto retry: the next poll re-detects the address
                warn!("Abandoning pending update to {}", address);
                self.emit_event(EngineEvent::CandidateAbandoned {
                    address,
                    error: probe_error.unwrap_or_default(),
                });
            }
            Expiry::Moved { from, to, .. } => {
                info!(
                    "Address changed during stability window ({} -> {}), restarting timer",
                    from, to
                );
                self.emit_event(EngineEvent::StabilityWindowMoved { from, to });
                self.announce_wait(to);
            }
            Expiry::Publish { address } => {
                self.publish(address).await;
            }
        }
    }

    /// Write a stable address to the record
    async fn publish(&mut self, address: Ipv6Addr) {
        info!(
            "Address stable for {} seconds, updating DNS",
            self.debounce.stability_delay().as_secs()
        );

        let previous = self.debounce.last_confirmed();

        match self
            .provider
            .upsert(&self.record, self.record_id.as_ref(), address)
            .await
        {
            Ok(record_id) => {
                let created = self.record_id.is_none();
                if created {
                    info!(
                        "Created DNS record {} -> {} (id: {})",
                        self.record.name, address, record_id
                    );
                } else {
                    info!("Successfully updated DNS record to {}", address);
                }

                self.record_id = Some(record_id.clone());
                self.debounce.confirm(address);
                self.emit_event(EngineEvent::RecordUpdated {
                    address,
                    previous,
                    record_id,
                    created,
                });
            }
            Err(e) => {
                // The old confirmed address stays authoritative; no retry
                match &e {
                    Error::Api(_) => error!(
                        "{} rejected update of {} to {}: {}",
                        self.provider.provider_name(),
                        self.record.name,
                        address,
                        e
                    ),
                    _ => error!(
                        "Failed to update DNS record {} to {}: {}",
                        self.record.name, address, e
                    ),
                }
                self.emit_event(EngineEvent::UpdateFailed {
                    address,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Stop polling and cancel the stability timer
    ///
    /// Idempotent within one run: later calls do nothing until the engine is
    /// run again.
    pub fn shutdown(&mut self, reason: &str) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        info!("Shutting down ({})", reason);
        if let Some(cancelled) = self.debounce.cancel() {
            info!("Cancelled pending update to {}", cancelled);
        }

        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });
    }

    fn announce_wait(&self, address: Ipv6Addr) {
        let delay = self.debounce.stability_delay();
        info!("Waiting {} seconds for address stability...", delay.as_secs());
        self.emit_event(EngineEvent::StabilityWaitStarted { address, delay });
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Resolves at `deadline`, never if no timer runs
async fn stability_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Wait for SIGTERM or SIGINT
///
/// Handlers are installed before returning so setup errors surface at startup.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT"
    })
}
