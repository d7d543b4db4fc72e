//! Static routing table

use std::net::Ipv4Addr;

/// Static route entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Destination network
    pub destination: Ipv4Addr,
    /// Network mask
    pub netmask: Ipv4Addr,
    /// Next hop; `0.0.0.0` for directly connected networks
    pub gateway: Ipv4Addr,
    /// Outgoing interface name
    pub interface: String,
}

impl Route {
    pub fn new(
        destination: Ipv4Addr,
        netmask: Ipv4Addr,
        gateway: Ipv4Addr,
        interface: impl Into<String>,
    ) -> Self {
        Self {
            destination,
            netmask,
            gateway,
            interface: interface.into(),
        }
    }

    /// Number of one bits in the netmask
    pub fn prefix_len(&self) -> u32 {
        u32::from(self.netmask).count_ones()
    }

    pub fn matches(&self, addr: Ipv4Addr) -> bool {
        let mask = u32::from(self.netmask);
        u32::from(self.destination) & mask == u32::from(addr) & mask
    }

    /// Address to resolve for a datagram headed to `dst` over this route
    pub fn next_hop(&self, dst: Ipv4Addr) -> Ipv4Addr {
        if self.gateway.is_unspecified() {
            dst
        } else {
            self.gateway
        }
    }
}

/// Routing table kept in load order.
///
/// Entries are never added or removed once the router is running.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: Vec<Route>,
}

impl RoutingTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Most specific matching route; ties go to the earliest entry
    pub fn longest_prefix_match(&self, addr: Ipv4Addr) -> Option<&Route> {
        let mut best: Option<&Route> = None;
        for route in self.routes.iter().filter(|r| r.matches(addr)) {
            // strictly longer only, so the first of equal length is kept
            if best.map_or(true, |b| route.prefix_len() > b.prefix_len()) {
                best = Some(route);
            }
        }
        best
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
