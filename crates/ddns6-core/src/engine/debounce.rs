//! Debounce state machine
//!
//! Tracks the last confirmed address and the candidate waiting for its
//! stability window. It performs no I/O: the engine feeds it probe results
//! and acts on the returned decisions.
//!
//! The stability timer is the deadline stored with the pending candidate, so
//! a timer runs exactly when a candidate is pending, and there is never more
//! than one.

use std::net::Ipv6Addr;
use tokio::time::{Duration, Instant};

/// Deadline used when the stability delay overflows the clock (~30 years)
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// A candidate address waiting out its stability window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub address: Ipv6Addr,
    pub deadline: Instant,
}

/// Outcome of feeding one successful poll to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Address equals the confirmed one, nothing pending
    Unchanged,
    /// Address went back to the confirmed one; the pending candidate and its
    /// timer were dropped
    Reverted {
        current: Ipv6Addr,
        cancelled: Ipv6Addr,
    },
    /// New candidate; the stability timer was (re)started
    Candidate {
        address: Ipv6Addr,
        previous: Option<Ipv6Addr>,
        replaced: Option<Ipv6Addr>,
        deadline: Instant,
    },
    /// Candidate already under watch
    AlreadyPending { address: Ipv6Addr },
}

/// Outcome of a stability timer expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// No candidate was pending
    Idle,
    /// Re-probe failed; the candidate is dropped without touching DNS
    Abandoned { address: Ipv6Addr },
    /// Address moved during the window; the timer restarts for the new one
    Moved {
        from: Ipv6Addr,
        to: Ipv6Addr,
        deadline: Instant,
    },
    /// Address held for the whole window and must be published
    Publish { address: Ipv6Addr },
}

/// Debounce state: last confirmed address plus the pending candidate
#[derive(Debug, Clone)]
pub struct Debouncer {
    stability_delay: Duration,
    last_confirmed: Option<Ipv6Addr>,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(stability_delay: Duration) -> Self {
        Self {
            stability_delay,
            last_confirmed: None,
            pending: None,
        }
    }

    /// Address last published (or found published at startup)
    pub fn last_confirmed(&self) -> Option<Ipv6Addr> {
        self.last_confirmed
    }

    /// Candidate currently under watch
    pub fn pending(&self) -> Option<Pending> {
        self.pending
    }

    /// When the running stability timer fires, if one runs
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    pub fn stability_delay(&self) -> Duration {
        self.stability_delay
    }

    /// Seed the confirmed address from the record already published
    pub fn seed(&mut self, address: Ipv6Addr) {
        self.last_confirmed = Some(address);
    }

    /// Feed the address read by a poll
    pub fn observe(&mut self, current: Ipv6Addr, now: Instant) -> Observation {
        if Some(current) == self.last_confirmed {
            return match self.pending.take() {
                Some(p) => Observation::Reverted {
                    current,
                    cancelled: p.address,
                },
                None => Observation::Unchanged,
            };
        }

        if let Some(p) = self.pending
            && p.address == current
        {
            return Observation::AlreadyPending { address: current };
        }

        let replaced = self.pending.map(|p| p.address);
        let deadline = self.arm(current, now);
        Observation::Candidate {
            address: current,
            previous: self.last_confirmed,
            replaced,
            deadline,
        }
    }

    /// Handle the stability timer firing
    ///
    /// `reprobed` is the address read again at expiry, `None` if that read
    /// failed.
    pub fn on_timer_expired(&mut self, reprobed: Option<Ipv6Addr>, now: Instant) -> Expiry {
        let Some(pending) = self.pending.take() else {
            return Expiry::Idle;
        };

        match reprobed {
            None => Expiry::Abandoned {
                address: pending.address,
            },
            Some(current) if current != pending.address => {
                // No cap: an address that never settles keeps re-arming
                let deadline = self.arm(current, now);
                Expiry::Moved {
                    from: pending.address,
                    to: current,
                    deadline,
                }
            }
            Some(current) => Expiry::Publish { address: current },
        }
    }

    /// Record a successful publish
    pub fn confirm(&mut self, address: Ipv6Addr) {
        self.last_confirmed = Some(address);
    }

    /// Drop the pending candidate and stop its timer
    ///
    /// Idempotent. Returns the dropped candidate, if any.
    pub fn cancel(&mut self) -> Option<Ipv6Addr> {
        self.pending.take().map(|p| p.address)
    }

    fn arm(&mut self, address: Ipv6Addr, now: Instant) -> Instant {
        let deadline = now
            .checked_add(self.stability_delay)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        self.pending = Some(Pending { address, deadline });
        deadline
    }
}
