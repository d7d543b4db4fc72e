//! ARP cache and pending-resolution queue
//!
//! Learned IP to MAC bindings and the frames waiting on unresolved next hops
//! live in one structure behind a single mutex. Every operation takes the
//! lock for a bounded map update and hands back what must be transmitted;
//! callers send after the lock is released.

use crate::protocol::ethernet::FrameMut;
use crate::protocol::MacAddr;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default lifetime of a learned binding
pub const DEFAULT_ENTRY_TIMEOUT: Duration = Duration::from_secs(15);

/// Default spacing between ARP request retransmissions
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of ARP requests sent before giving up
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Timers and retry bound for the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpCacheConfig {
    pub entry_timeout: Duration,
    pub retry_interval: Duration,
    pub max_retries: u32,
}

impl Default for ArpCacheConfig {
    fn default() -> Self {
        Self {
            entry_timeout: DEFAULT_ENTRY_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ArpEntry {
    mac: MacAddr,
    inserted_at: Instant,
}

/// Ethernet frame parked until its next hop resolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFrame {
    /// Complete frame; destination MAC is filled in on resolution
    pub frame: Vec<u8>,
    /// Interface the frame leaves on
    pub interface: String,
    /// Interface the original datagram arrived on, `None` when the router
    /// originated it
    pub ingress: Option<String>,
}

#[derive(Debug)]
struct PendingRequest {
    interface: String,
    times_sent: u32,
    last_sent_at: Instant,
    frames: Vec<QueuedFrame>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<Ipv4Addr, ArpEntry>,
    pending: HashMap<Ipv4Addr, PendingRequest>,
}

/// Outcome of [`ArpCache::resolve_or_queue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Binding was fresh; the frame now carries the destination MAC
    Resolved(Vec<u8>),
    /// Appended behind a request already in flight
    Queued,
    /// First frame for this next hop; an ARP request must be broadcast
    RequestNeeded,
}

/// ARP request to retransmit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpRetry {
    pub target_ip: Ipv4Addr,
    pub interface: String,
}

/// Work produced by one sweep
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Requests still within the retry bound
    pub retries: Vec<ArpRetry>,
    /// Next hops abandoned after the retry bound
    pub abandoned: Vec<Ipv4Addr>,
    /// Frames whose next hop never answered
    pub unreachable: Vec<QueuedFrame>,
    /// Number of bindings purged
    pub expired: usize,
}

/// Shared ARP cache
#[derive(Debug, Default)]
pub struct ArpCache {
    config: ArpCacheConfig,
    state: Mutex<CacheState>,
}

impl ArpCache {
    pub fn new(config: ArpCacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn config(&self) -> &ArpCacheConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        // a panic elsewhere cannot leave the maps half-updated
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &ArpEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) <= self.config.entry_timeout
    }

    /// MAC for `ip` if a fresh binding exists
    pub fn lookup(&self, ip: Ipv4Addr) -> Option<MacAddr> {
        self.lookup_at(ip, Instant::now())
    }

    pub fn lookup_at(&self, ip: Ipv4Addr, now: Instant) -> Option<MacAddr> {
        let state = self.state();
        state
            .entries
            .get(&ip)
            .filter(|e| self.is_fresh(e, now))
            .map(|e| e.mac)
    }

    /// Address `frame` to `next_hop` or park it until the next hop resolves.
    ///
    /// At most one pending request exists per next hop; later frames join
    /// its queue in arrival order.
    pub fn resolve_or_queue(
        &self,
        next_hop: Ipv4Addr,
        frame: Vec<u8>,
        interface: &str,
        ingress: Option<&str>,
    ) -> Resolution {
        self.resolve_or_queue_at(next_hop, frame, interface, ingress, Instant::now())
    }

    pub fn resolve_or_queue_at(
        &self,
        next_hop: Ipv4Addr,
        mut frame: Vec<u8>,
        interface: &str,
        ingress: Option<&str>,
        now: Instant,
    ) -> Resolution {
        let mut state = self.state();

        if let Some(entry) = state.entries.get(&next_hop) {
            if self.is_fresh(entry, now) {
                set_dst_mac(&mut frame, entry.mac);
                return Resolution::Resolved(frame);
            }
        }

        let queued = QueuedFrame {
            frame,
            interface: interface.to_string(),
            ingress: ingress.map(str::to_string),
        };

        match state.pending.get_mut(&next_hop) {
            Some(request) => {
                request.frames.push(queued);
                Resolution::Queued
            }
            None => {
                state.pending.insert(
                    next_hop,
                    PendingRequest {
                        interface: interface.to_string(),
                        times_sent: 1,
                        last_sent_at: now,
                        frames: vec![queued],
                    },
                );
                Resolution::RequestNeeded
            }
        }
    }

    /// Record a binding and release any frames waiting on it.
    ///
    /// Returned frames are in enqueue order with the destination MAC set.
    /// The pending request is gone once this returns, so a second identical
    /// reply releases nothing.
    pub fn insert(&self, ip: Ipv4Addr, mac: MacAddr) -> Vec<QueuedFrame> {
        self.insert_at(ip, mac, Instant::now())
    }

    pub fn insert_at(&self, ip: Ipv4Addr, mac: MacAddr, now: Instant) -> Vec<QueuedFrame> {
        let mut state = self.state();
        state.entries.insert(
            ip,
            ArpEntry {
                mac,
                inserted_at: now,
            },
        );

        let Some(request) = state.pending.remove(&ip) else {
            return Vec::new();
        };
        let mut frames = request.frames;
        for queued in &mut frames {
            set_dst_mac(&mut queued.frame, mac);
        }
        frames
    }

    /// Expire stale bindings and advance every pending request
    pub fn sweep(&self) -> SweepOutcome {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> SweepOutcome {
        let mut state = self.state();
        let mut outcome = SweepOutcome::default();

        let before = state.entries.len();
        state.entries.retain(|_, e| self.is_fresh(e, now));
        outcome.expired = before - state.entries.len();

        let retry_interval = self.config.retry_interval;
        let max_retries = self.config.max_retries;
        let mut exhausted = Vec::new();

        for (ip, request) in state.pending.iter_mut() {
            if now.saturating_duration_since(request.last_sent_at) < retry_interval {
                continue;
            }
            if request.times_sent >= max_retries {
                exhausted.push(*ip);
            } else {
                request.times_sent += 1;
                request.last_sent_at = now;
                outcome.retries.push(ArpRetry {
                    target_ip: *ip,
                    interface: request.interface.clone(),
                });
            }
        }

        for ip in exhausted {
            if let Some(request) = state.pending.remove(&ip) {
                outcome.abandoned.push(ip);
                outcome.unreachable.extend(request.frames);
            }
        }

        outcome
    }

    /// Number of bindings held, fresh or not yet swept
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of next hops awaiting resolution
    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn has_pending(&self, ip: Ipv4Addr) -> bool {
        self.state().pending.contains_key(&ip)
    }

    /// Frames waiting on `ip`
    pub fn queued_len(&self, ip: Ipv4Addr) -> usize {
        self.state().pending.get(&ip).map_or(0, |r| r.frames.len())
    }

    /// Requests sent so far for `ip`
    pub fn times_sent(&self, ip: Ipv4Addr) -> Option<u32> {
        self.state().pending.get(&ip).map(|r| r.times_sent)
    }
}

fn set_dst_mac(frame: &mut [u8], mac: MacAddr) {
    if let Ok(mut eth) = FrameMut::new(frame) {
        eth.set_dst_mac(mac);
    }
}
