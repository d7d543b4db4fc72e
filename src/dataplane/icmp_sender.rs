//! ICMP generation for locally originated messages

use crate::dataplane::Router;
use crate::protocol::ethernet::FrameBuilder;
use crate::protocol::icmp::{self, dest_unreachable, IcmpType};
use crate::protocol::ipv4::{self, Ipv4Builder};
use crate::protocol::{EtherType, MacAddr};
use std::net::Ipv4Addr;
use tracing::{debug, warn};

impl Router {
    /// Send an ICMP message whose body is `payload` verbatim
    pub fn send_icmp(
        &self,
        icmp_type: IcmpType,
        code: u8,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        payload: &[u8],
    ) {
        let message = icmp::build_message(icmp_type, code, payload);
        self.record_icmp(icmp_type, code);
        self.send_ip(ipv4::protocol::ICMP, src, dst, &message);
    }

    /// Send an ICMP error quoting `ip_header` and the start of `payload`
    pub fn send_icmp_type3(
        &self,
        icmp_type: IcmpType,
        code: u8,
        src: Ipv4Addr,
        dst: Ipv4Addr,
        ip_header: &[u8],
        payload: &[u8],
    ) {
        let message = icmp::build_error(icmp_type, code, ip_header, payload);
        self.record_icmp(icmp_type, code);
        self.send_ip(ipv4::protocol::ICMP, src, dst, &message);
    }

    /// Route, frame and send a locally originated datagram
    pub fn send_ip(&self, protocol: u8, src: Ipv4Addr, dst: Ipv4Addr, payload: &[u8]) {
        let Some(route) = self.routes().longest_prefix_match(dst) else {
            debug!("No route to {} for local datagram, dropping", dst);
            return;
        };
        let Some(egress) = self.egress(&route.interface) else {
            warn!(
                "Route to {} points at unknown interface {}",
                dst, route.interface
            );
            return;
        };

        let packet = Ipv4Builder::new(protocol, src, dst).build(payload);
        let frame = FrameBuilder::new(EtherType::Ipv4)
            .dst_mac(MacAddr::ZERO)
            .src_mac(egress.mac)
            .build(&packet);

        self.resolve_and_send(route.next_hop(dst), frame, &egress.name, None);
    }

    fn record_icmp(&self, icmp_type: IcmpType, code: u8) {
        let metrics = self.metrics();
        match (icmp_type, code) {
            (IcmpType::EchoReply, _) => metrics.icmp_echo_replies.inc(),
            (IcmpType::TimeExceeded, _) => metrics.icmp_time_exceeded.inc(),
            (IcmpType::DestinationUnreachable, dest_unreachable::NET_UNREACHABLE) => {
                metrics.icmp_net_unreachable.inc()
            }
            (IcmpType::DestinationUnreachable, dest_unreachable::HOST_UNREACHABLE) => {
                metrics.icmp_host_unreachable.inc()
            }
            (IcmpType::DestinationUnreachable, dest_unreachable::PORT_UNREACHABLE) => {
                metrics.icmp_port_unreachable.inc()
            }
            _ => {}
        }
    }
}
