//! sr-router - static IPv4 software router
//!
//! Forwarding plane that takes raw Ethernet frames from a packet I/O layer
//! and answers, forwards, or drops each one. ARP resolution is cached and
//! swept in the background; ICMP errors are synthesized for expired TTLs,
//! missing routes, unsupported local protocols and unresolvable next hops.

pub mod capture;
pub mod config;
pub mod dataplane;
pub mod error;
pub mod protocol;
pub mod telemetry;

pub use error::{Error, Result};
