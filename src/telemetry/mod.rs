//! Telemetry module for logging and metrics.
//!
//! Provides:
//! - Logging initialization driven by `RUST_LOG` or the config file
//! - Counters for packet, ARP and ICMP activity

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig};
pub use metrics::{Counter, Gauge, InterfaceStats, MetricsRegistry};
