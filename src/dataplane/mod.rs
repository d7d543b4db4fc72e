//! Data plane components
//!
//! Handles packet processing: parsing, forwarding decisions, ARP resolution
//! and transmission.

mod arp_cache;
mod arp_processor;
mod forwarder;
mod icmp_sender;
mod interface;
mod router;
mod routing;
mod sweeper;

pub use arp_cache::{
    ArpCache, ArpCacheConfig, ArpRetry, QueuedFrame, Resolution, SweepOutcome,
    DEFAULT_ENTRY_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL,
};
pub use arp_processor::{process_arp, ArpAction};
pub use forwarder::{deliver_local, forward, ForwardAction, LocalAction};
pub use interface::{Interface, InterfaceTable};
pub use router::Router;
pub use routing::{Route, RoutingTable};
pub use sweeper::Sweeper;
