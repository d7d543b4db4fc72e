//! Packet forwarder
//!
//! Pure forwarding decisions for IPv4 frames: local delivery, TTL handling
//! and route selection. Side effects (ICMP, ARP, transmission) belong to the
//! router.

use crate::dataplane::{InterfaceTable, RoutingTable};
use crate::protocol::ethernet::{self, Frame, FrameMut};
use crate::protocol::icmp::IcmpPacket;
use crate::protocol::ipv4::{self, Ipv4Header, Ipv4HeaderMut};
use crate::Result;
use std::net::Ipv4Addr;

/// Result of a forwarding decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardAction {
    /// Addressed to one of the router's interfaces
    Local,
    /// TTL would reach zero in transit
    TtlExpired,
    /// No matching route; `frame` carries the decremented TTL
    NoRoute { frame: Vec<u8> },
    /// TTL decremented, checksum and source MAC rewritten; the destination
    /// MAC still needs resolving
    Forward {
        frame: Vec<u8>,
        next_hop: Ipv4Addr,
        interface: String,
    },
    /// Route names an interface the router does not have
    UnknownInterface { interface: String },
}

/// Decide what to do with an IPv4 frame.
///
/// Fails only when the Ethernet or IPv4 header is malformed.
pub fn forward(
    frame: &[u8],
    interfaces: &InterfaceTable,
    routes: &RoutingTable,
) -> Result<ForwardAction> {
    let eth = Frame::parse(frame)?;
    let ip = Ipv4Header::parse(eth.payload())?;
    let dst = ip.dst_addr();

    if interfaces.is_local(dst) {
        return Ok(ForwardAction::Local);
    }

    // TTL 0 on arrival is treated like TTL 1
    if ip.ttl() <= 1 {
        return Ok(ForwardAction::TtlExpired);
    }

    let mut out = frame.to_vec();
    {
        let mut hdr = Ipv4HeaderMut::new(&mut out[ethernet::HEADER_LEN..])?;
        let ttl = hdr.ttl();
        hdr.set_ttl(ttl - 1);
    }

    let Some(route) = routes.longest_prefix_match(dst) else {
        return Ok(ForwardAction::NoRoute { frame: out });
    };

    let Some(egress) = interfaces.get(&route.interface) else {
        return Ok(ForwardAction::UnknownInterface {
            interface: route.interface.clone(),
        });
    };

    FrameMut::new(&mut out)?.set_src_mac(egress.mac);

    Ok(ForwardAction::Forward {
        frame: out,
        next_hop: route.next_hop(dst),
        interface: egress.name.clone(),
    })
}

/// What the router does with a datagram addressed to itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalAction {
    /// Answer an echo request; `body` is identifier, sequence and data
    EchoReply { body: Vec<u8> },
    /// Non-ICMP protocol: nothing listens here
    PortUnreachable,
    /// ICMP other than echo request, or a truncated ICMP header
    Ignore,
}

pub fn deliver_local(ip: &Ipv4Header<'_>) -> LocalAction {
    if ip.protocol() != ipv4::protocol::ICMP {
        return LocalAction::PortUnreachable;
    }
    match IcmpPacket::parse(ip.payload()) {
        Ok(icmp) if icmp.is_echo_request() => LocalAction::EchoReply {
            body: icmp.body().to_vec(),
        },
        _ => LocalAction::Ignore,
    }
}
