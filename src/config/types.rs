//! Configuration types

use crate::dataplane::{ArpCacheConfig, Route, RoutingTable};
use crate::protocol::MacAddr;
use crate::telemetry::LogConfig;
use crate::{Error, Result};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Router configuration file (router.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// `[router]` timers, all in seconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// How long a learned binding stays usable
    pub arp_cache_timeout: u64,
    /// Spacing between ARP retransmissions
    pub arp_retry_interval: u64,
    /// Requests sent before a next hop is declared unreachable
    pub arp_max_retries: u32,
    /// Period of the cache sweeper
    pub sweep_interval: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        let cache = ArpCacheConfig::default();
        Self {
            arp_cache_timeout: cache.entry_timeout.as_secs(),
            arp_retry_interval: cache.retry_interval.as_secs(),
            arp_max_retries: cache.max_retries,
            sweep_interval: 1,
        }
    }
}

impl RouterConfig {
    pub fn cache_config(&self) -> ArpCacheConfig {
        ArpCacheConfig {
            entry_timeout: Duration::from_secs(self.arp_cache_timeout),
            retry_interval: Duration::from_secs(self.arp_retry_interval),
            max_retries: self.arp_max_retries,
        }
    }

    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

/// `[[interfaces]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub ip: Ipv4Addr,
    /// Colon separated; read from the system when absent
    #[serde(default)]
    pub mac: Option<String>,
}

impl InterfaceConfig {
    /// Configured MAC, if any
    pub fn parsed_mac(&self) -> Result<Option<MacAddr>> {
        self.mac
            .as_deref()
            .map(|s| {
                s.parse::<MacAddr>().map_err(|e| {
                    Error::Config(format!("interfaces.{}: {}", self.name, e))
                })
            })
            .transpose()
    }
}

/// `[[routes]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub destination: Ipv4Addr,
    pub netmask: Ipv4Addr,
    /// `0.0.0.0` (the default) for directly connected networks
    #[serde(default = "unspecified")]
    pub gateway: Ipv4Addr,
    pub interface: String,
}

fn unspecified() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

impl RouteConfig {
    pub fn to_route(&self) -> Route {
        Route::new(
            self.destination,
            self.netmask,
            self.gateway,
            self.interface.as_str(),
        )
    }
}

impl Config {
    /// Routes in file order
    pub fn routing_table(&self) -> RoutingTable {
        RoutingTable::new(self.routes.iter().map(RouteConfig::to_route).collect())
    }
}
