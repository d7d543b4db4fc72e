//! ARP packet processor
//!
//! Decides what an inbound ARP packet means for one interface. The router
//! applies the decision to the shared cache and transmits any reply.

use crate::protocol::arp::{ArpOp, ArpPacket};
use crate::protocol::MacAddr;
use std::net::Ipv4Addr;

/// Result of processing an ARP packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArpAction {
    /// Not addressed to this interface
    Ignore,
    /// Record the sender binding
    Learn { ip: Ipv4Addr, mac: MacAddr },
    /// Record the sender binding and answer with `reply`
    LearnAndReply {
        ip: Ipv4Addr,
        mac: MacAddr,
        reply: ArpPacket,
    },
}

/// Process an ARP packet received on the interface owning `local_ip`.
///
/// Only packets whose target is `local_ip` are considered; there is no proxy
/// ARP and no learning from traffic aimed at other hosts.
pub fn process_arp(packet: &ArpPacket, local_ip: Ipv4Addr, local_mac: MacAddr) -> ArpAction {
    if packet.target_ip != local_ip {
        return ArpAction::Ignore;
    }

    let ip = packet.sender_ip;
    let mac = packet.sender_mac;

    match packet.operation {
        ArpOp::Request => ArpAction::LearnAndReply {
            ip,
            mac,
            reply: ArpPacket::reply(local_mac, local_ip, mac, ip),
        },
        ArpOp::Reply => ArpAction::Learn { ip, mac },
    }
}
