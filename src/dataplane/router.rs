//! Packet processing router
//!
//! Ties the interface table, routing table and ARP cache to a transport.
//! Every entry point takes `&self`; receive tasks and the sweeper share one
//! `Arc<Router>`.

use crate::capture::Transport;
use crate::dataplane::{
    deliver_local, forward, process_arp, ArpAction, ArpCache, ArpCacheConfig, ForwardAction,
    Interface, InterfaceTable, LocalAction, QueuedFrame, Resolution, RoutingTable,
};
use crate::protocol::arp::ArpPacket;
use crate::protocol::ethernet::{self, Frame, FrameBuilder};
use crate::protocol::icmp::{dest_unreachable, time_exceeded, IcmpType};
use crate::protocol::ipv4::Ipv4Header;
use crate::protocol::{EtherType, MacAddr};
use crate::telemetry::MetricsRegistry;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// The router: static tables, the shared ARP cache and an outbound transport
pub struct Router {
    interfaces: InterfaceTable,
    routes: RoutingTable,
    cache: ArpCache,
    transport: Arc<dyn Transport>,
    metrics: Arc<MetricsRegistry>,
}

impl Router {
    pub fn new(
        interfaces: InterfaceTable,
        routes: RoutingTable,
        cache_config: ArpCacheConfig,
        transport: Arc<dyn Transport>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        for iface in interfaces.iter() {
            metrics.register_interface(&iface.name);
        }
        metrics.route_count.set(routes.len());

        Self {
            interfaces,
            routes,
            cache: ArpCache::new(cache_config),
            transport,
            metrics,
        }
    }

    pub fn interfaces(&self) -> &InterfaceTable {
        &self.interfaces
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    pub fn cache(&self) -> &ArpCache {
        &self.cache
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Entry point for every frame received on `interface`.
    ///
    /// Never fails; malformed input is logged and dropped.
    pub fn handle_frame(&self, frame: &[u8], interface: &str) {
        self.metrics.record_rx(interface, frame.len());

        let eth = match Frame::parse(frame) {
            Ok(eth) => eth,
            Err(e) => {
                warn!("Malformed frame on {}: {}", interface, e);
                self.record_malformed(interface);
                return;
            }
        };

        trace!(
            "{} -> {} type 0x{:04x} ({} bytes) on {}",
            eth.src_mac(),
            eth.dst_mac(),
            eth.ethertype(),
            frame.len(),
            interface
        );

        match EtherType::from_u16(eth.ethertype()) {
            Some(EtherType::Arp) => self.handle_arp(eth.payload(), interface),
            Some(EtherType::Ipv4) => self.handle_ip(frame, interface),
            None => {
                trace!("Unsupported EtherType: 0x{:04x}", eth.ethertype());
                self.metrics.record_rx_drop(interface);
            }
        }
    }

    /// Handle an ARP payload (Ethernet header already stripped)
    pub fn handle_arp(&self, arp_bytes: &[u8], interface: &str) {
        let arp = match ArpPacket::parse(arp_bytes) {
            Ok(arp) => arp,
            Err(e) => {
                warn!("Malformed ARP packet on {}: {}", interface, e);
                self.record_malformed(interface);
                return;
            }
        };

        let Some(iface) = self.interfaces.get(interface) else {
            warn!("ARP on unknown interface {}", interface);
            return;
        };

        match process_arp(&arp, iface.ip, iface.mac) {
            ArpAction::Ignore => {
                trace!("ARP for {} is not for {} ({})", arp.target_ip, interface, iface.ip);
            }
            ArpAction::Learn { ip, mac } => self.learn(ip, mac),
            ArpAction::LearnAndReply { ip, mac, reply } => {
                self.learn(ip, mac);
                let frame = FrameBuilder::new(EtherType::Arp)
                    .dst_mac(mac)
                    .src_mac(iface.mac)
                    .build(&reply.to_bytes());
                debug!("Sending ARP reply to {} on {}", ip, interface);
                self.metrics.arp_replies_sent.inc();
                self.transmit(&frame, interface);
            }
        }
    }

    fn learn(&self, ip: Ipv4Addr, mac: MacAddr) {
        let flushed = self.cache.insert(ip, mac);
        if !flushed.is_empty() {
            debug!(
                "ARP resolved {} is-at {}, sending {} queued frames",
                ip,
                mac,
                flushed.len()
            );
        }
        for queued in flushed {
            self.transmit(&queued.frame, &queued.interface);
        }
        self.update_cache_gauges();
    }

    /// Handle a full Ethernet frame carrying IPv4
    pub fn handle_ip(&self, frame: &[u8], interface: &str) {
        let Some(ingress) = self.interfaces.get(interface) else {
            warn!("IPv4 on unknown interface {}", interface);
            return;
        };

        let action = match forward(frame, &self.interfaces, &self.routes) {
            Ok(action) => action,
            Err(e) => {
                warn!("Malformed IPv4 frame on {}: {}", interface, e);
                self.record_malformed(interface);
                return;
            }
        };

        match action {
            ForwardAction::Local => self.handle_local(frame),
            ForwardAction::TtlExpired => {
                debug!("TTL expired on {}", interface);
                self.send_icmp_error(
                    frame,
                    IcmpType::TimeExceeded,
                    time_exceeded::TTL_EXCEEDED,
                    ingress.ip,
                );
            }
            ForwardAction::NoRoute { frame: decremented } => {
                debug!("No route for datagram received on {}", interface);
                self.send_icmp_error(
                    &decremented,
                    IcmpType::DestinationUnreachable,
                    dest_unreachable::NET_UNREACHABLE,
                    ingress.ip,
                );
            }
            ForwardAction::Forward {
                frame: out,
                next_hop,
                interface: egress,
            } => {
                trace!("Forwarding via {} on {}", next_hop, egress);
                self.metrics.packets_forwarded.inc();
                self.resolve_and_send(next_hop, out, &egress, Some(interface));
            }
            ForwardAction::UnknownInterface { interface: missing } => {
                warn!("Route points at unknown interface {}, dropping", missing);
            }
        }
    }

    fn handle_local(&self, frame: &[u8]) {
        let Ok(ip) = Ipv4Header::parse(&frame[ethernet::HEADER_LEN..]) else {
            return;
        };

        match deliver_local(&ip) {
            LocalAction::EchoReply { body } => {
                debug!("Echo request from {} to {}", ip.src_addr(), ip.dst_addr());
                self.send_icmp(IcmpType::EchoReply, 0, ip.dst_addr(), ip.src_addr(), &body);
            }
            LocalAction::PortUnreachable => {
                debug!(
                    "Protocol {} from {} to {}, port unreachable",
                    ip.protocol(),
                    ip.src_addr(),
                    ip.dst_addr()
                );
                if self.may_report_to(ip.src_addr()) {
                    self.send_icmp_type3(
                        IcmpType::DestinationUnreachable,
                        dest_unreachable::PORT_UNREACHABLE,
                        ip.dst_addr(),
                        ip.src_addr(),
                        ip.header_bytes(),
                        ip.payload(),
                    );
                }
            }
            LocalAction::Ignore => {
                trace!("Ignoring local ICMP from {}", ip.src_addr());
            }
        }
    }

    /// Answer the datagram in `frame` with an ICMP error sourced from `src`
    fn send_icmp_error(&self, frame: &[u8], icmp_type: IcmpType, code: u8, src: Ipv4Addr) {
        let Ok(ip) = Ipv4Header::parse(&frame[ethernet::HEADER_LEN..]) else {
            return;
        };
        if !self.may_report_to(ip.src_addr()) {
            return;
        }
        self.send_icmp_type3(
            icmp_type,
            code,
            src,
            ip.src_addr(),
            ip.header_bytes(),
            ip.payload(),
        );
    }

    /// Errors are never sent back to our own addresses
    fn may_report_to(&self, dst: Ipv4Addr) -> bool {
        if self.interfaces.is_local(dst) {
            debug!("Suppressing ICMP error to local address {}", dst);
            return false;
        }
        true
    }

    /// Expire stale bindings, retransmit ARP requests and report next hops
    /// that never answered
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    pub fn sweep_at(&self, now: Instant) {
        let outcome = self.cache.sweep_at(now);

        if outcome.expired > 0 {
            debug!("Expired {} ARP entries", outcome.expired);
        }
        for retry in &outcome.retries {
            debug!(
                "Retransmitting ARP request for {} on {}",
                retry.target_ip, retry.interface
            );
            self.send_arp_request(retry.target_ip, &retry.interface);
        }
        for ip in &outcome.abandoned {
            warn!(
                "No ARP reply from {} after {} requests",
                ip,
                self.cache.config().max_retries
            );
            self.metrics.arp_resolution_failures.inc();
        }
        for queued in outcome.unreachable {
            self.report_host_unreachable(queued);
        }

        self.update_cache_gauges();
    }

    fn report_host_unreachable(&self, queued: QueuedFrame) {
        let Ok(eth) = Frame::parse(&queued.frame) else {
            return;
        };
        let Ok(ip) = Ipv4Header::parse(eth.payload()) else {
            return;
        };
        if !self.may_report_to(ip.src_addr()) {
            return;
        }

        let source = queued
            .ingress
            .as_deref()
            .and_then(|name| self.interfaces.get(name))
            .or_else(|| self.interfaces.get(&queued.interface))
            .map(|iface| iface.ip);
        let Some(source) = source else {
            return;
        };

        self.send_icmp_type3(
            IcmpType::DestinationUnreachable,
            dest_unreachable::HOST_UNREACHABLE,
            source,
            ip.src_addr(),
            ip.header_bytes(),
            ip.payload(),
        );
    }

    /// Transmit `frame` once `next_hop` resolves.
    ///
    /// `ingress` names the interface the datagram arrived on, `None` for
    /// router-originated traffic.
    pub(crate) fn resolve_and_send(
        &self,
        next_hop: Ipv4Addr,
        frame: Vec<u8>,
        interface: &str,
        ingress: Option<&str>,
    ) {
        match self
            .cache
            .resolve_or_queue(next_hop, frame, interface, ingress)
        {
            Resolution::Resolved(frame) => self.transmit(&frame, interface),
            Resolution::Queued => {
                trace!("Queued frame behind pending ARP request for {}", next_hop);
                self.metrics.packets_queued.inc();
            }
            Resolution::RequestNeeded => {
                debug!("Resolving {} on {}", next_hop, interface);
                self.metrics.packets_queued.inc();
                self.send_arp_request(next_hop, interface);
                self.update_cache_gauges();
            }
        }
    }

    fn send_arp_request(&self, target_ip: Ipv4Addr, interface: &str) {
        let Some(iface) = self.interfaces.get(interface) else {
            warn!("Cannot send ARP request: interface {} not found", interface);
            return;
        };
        let request = ArpPacket::request(iface.mac, iface.ip, target_ip);
        let frame = FrameBuilder::new(EtherType::Arp)
            .dst_mac(MacAddr::BROADCAST)
            .src_mac(iface.mac)
            .build(&request.to_bytes());
        self.metrics.arp_requests_sent.inc();
        self.transmit(&frame, interface);
    }

    pub(crate) fn egress(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    fn transmit(&self, frame: &[u8], interface: &str) {
        self.metrics.record_tx(interface, frame.len());
        self.transport.transmit(frame, interface);
    }

    fn record_malformed(&self, interface: &str) {
        self.metrics.frames_malformed.inc();
        self.metrics.record_rx_error(interface);
    }

    fn update_cache_gauges(&self) {
        self.metrics.arp_cache_size.set(self.cache.len());
        self.metrics
            .arp_pending_requests
            .set(self.cache.pending_len());
    }
}
