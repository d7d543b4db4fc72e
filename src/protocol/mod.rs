//! Wire formats: Ethernet II, ARP, IPv4 and ICMP
//!
//! Parsers are bounds-checked views over borrowed buffers; builders produce
//! owned frames ready for transmission.

pub mod arp;
pub mod checksum;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod types;

pub use types::*;
