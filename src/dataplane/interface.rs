//! Router interface table

use crate::protocol::MacAddr;
use std::net::Ipv4Addr;

/// One router port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
}

impl Interface {
    pub fn new(name: impl Into<String>, ip: Ipv4Addr, mac: MacAddr) -> Self {
        Self {
            name: name.into(),
            ip,
            mac,
        }
    }
}

/// Interfaces in configuration order, immutable once built
#[derive(Debug, Clone, Default)]
pub struct InterfaceTable {
    interfaces: Vec<Interface>,
}

impl InterfaceTable {
    pub fn new(interfaces: Vec<Interface>) -> Self {
        Self { interfaces }
    }

    pub fn get(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Interface owning `ip`, if the address is one of ours
    pub fn find_by_ip(&self, ip: Ipv4Addr) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.ip == ip)
    }

    pub fn is_local(&self, ip: Ipv4Addr) -> bool {
        self.find_by_ip(ip).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.iter()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
