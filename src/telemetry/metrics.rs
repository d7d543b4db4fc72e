//! Metrics collection for router statistics.
//!
//! Thread-safe counters shared by the packet path and the sweeper, kept both
//! globally and per interface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Atomic counter for thread-safe increment operations.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Gauge holding the last observed value.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn set(&self, val: usize) {
        self.0.store(val as u64, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-interface statistics.
#[derive(Debug, Default)]
pub struct InterfaceStats {
    /// Frames received.
    pub rx_packets: Counter,
    /// Bytes received.
    pub rx_bytes: Counter,
    /// Frames handed to the transport.
    pub tx_packets: Counter,
    /// Bytes handed to the transport.
    pub tx_bytes: Counter,
    /// Frames dropped for carrying an EtherType we do not handle.
    pub rx_drops: Counter,
    /// Frames that failed to parse.
    pub rx_errors: Counter,
}

impl InterfaceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_rx(&self, bytes: usize) {
        self.rx_packets.inc();
        self.rx_bytes.add(bytes as u64);
    }

    pub fn record_tx(&self, bytes: usize) {
        self.tx_packets.inc();
        self.tx_bytes.add(bytes as u64);
    }
}

/// Global metrics registry for the router.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    interfaces: RwLock<HashMap<String, InterfaceStats>>,

    // ARP
    /// ARP requests broadcast, retransmissions included.
    pub arp_requests_sent: Counter,
    /// ARP replies sent for our addresses.
    pub arp_replies_sent: Counter,
    /// Next hops abandoned after the retry bound.
    pub arp_resolution_failures: Counter,

    // Forwarding
    /// Datagrams forwarded toward another host.
    pub packets_forwarded: Counter,
    /// Frames parked awaiting ARP resolution.
    pub packets_queued: Counter,
    /// Frames dropped as malformed.
    pub frames_malformed: Counter,

    // ICMP
    pub icmp_echo_replies: Counter,
    pub icmp_time_exceeded: Counter,
    pub icmp_net_unreachable: Counter,
    pub icmp_host_unreachable: Counter,
    pub icmp_port_unreachable: Counter,

    // Gauges
    /// Bindings held by the ARP cache.
    pub arp_cache_size: Gauge,
    /// Next hops awaiting resolution.
    pub arp_pending_requests: Gauge,
    /// Static routes loaded.
    pub route_count: Gauge,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interface for statistics tracking.
    pub fn register_interface(&self, name: &str) {
        let mut interfaces = self
            .interfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        interfaces.entry(name.to_string()).or_default();
    }

    fn with_interface(&self, interface: &str, f: impl FnOnce(&InterfaceStats)) {
        let interfaces = self
            .interfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(stats) = interfaces.get(interface) {
            f(stats);
        }
    }

    pub fn record_rx(&self, interface: &str, bytes: usize) {
        self.with_interface(interface, |s| s.record_rx(bytes));
    }

    pub fn record_tx(&self, interface: &str, bytes: usize) {
        self.with_interface(interface, |s| s.record_tx(bytes));
    }

    pub fn record_rx_error(&self, interface: &str) {
        self.with_interface(interface, |s| s.rx_errors.inc());
    }

    pub fn record_rx_drop(&self, interface: &str) {
        self.with_interface(interface, |s| s.rx_drops.inc());
    }

    /// Exports all metrics as key-value pairs.
    pub fn export(&self) -> Vec<(String, u64)> {
        let mut result = vec![
            ("arp_requests_sent".into(), self.arp_requests_sent.get()),
            ("arp_replies_sent".into(), self.arp_replies_sent.get()),
            (
                "arp_resolution_failures".into(),
                self.arp_resolution_failures.get(),
            ),
            ("packets_forwarded".into(), self.packets_forwarded.get()),
            ("packets_queued".into(), self.packets_queued.get()),
            ("frames_malformed".into(), self.frames_malformed.get()),
            ("icmp_echo_replies".into(), self.icmp_echo_replies.get()),
            ("icmp_time_exceeded".into(), self.icmp_time_exceeded.get()),
            (
                "icmp_net_unreachable".into(),
                self.icmp_net_unreachable.get(),
            ),
            (
                "icmp_host_unreachable".into(),
                self.icmp_host_unreachable.get(),
            ),
            (
                "icmp_port_unreachable".into(),
                self.icmp_port_unreachable.get(),
            ),
            ("arp_cache_size".into(), self.arp_cache_size.get()),
            (
                "arp_pending_requests".into(),
                self.arp_pending_requests.get(),
            ),
            ("route_count".into(), self.route_count.get()),
        ];

        let interfaces = self
            .interfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<&String> = interfaces.keys().collect();
        names.sort();
        for name in names {
            let stats = &interfaces[name];
            result.extend([
                (format!("{}_rx_packets", name), stats.rx_packets.get()),
                (format!("{}_rx_bytes", name), stats.rx_bytes.get()),
                (format!("{}_tx_packets", name), stats.tx_packets.get()),
                (format!("{}_tx_bytes", name), stats.tx_bytes.get()),
                (format!("{}_rx_drops", name), stats.rx_drops.get()),
                (format!("{}_rx_errors", name), stats.rx_errors.get()),
            ]);
        }

        result
    }
}
