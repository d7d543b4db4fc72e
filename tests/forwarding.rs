//! Forwarding scenarios driven through `Router::handle_frame`
//!
//! Topology:
//! ```text
//!   host A 10.0.1.100 -- eth1 10.0.1.1 [router] 10.0.2.1 eth2 -- host B 10.0.2.100
//!                                                          \-- gateway 10.0.2.254 -> 172.16.0.0/16
//! ```

use sr_router::capture::{RecordingTransport, SentFrame};
use sr_router::dataplane::{ArpCacheConfig, Interface, InterfaceTable, Route, Router, RoutingTable};
use sr_router::protocol::arp::{ArpOp, ArpPacket};
use sr_router::protocol::checksum::checksum;
use sr_router::protocol::ethernet::{Frame, FrameBuilder};
use sr_router::protocol::icmp::{self, IcmpPacket, IcmpType};
use sr_router::protocol::ipv4::{self, Ipv4Builder, Ipv4Header};
use sr_router::protocol::{EtherType, MacAddr};
use sr_router::telemetry::MetricsRegistry;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const ETH1_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 1);
const ETH1_MAC: MacAddr = MacAddr([0x02, 0, 0, 0, 1, 1]);
const ETH2_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 2, 1);
const ETH2_MAC: MacAddr = MacAddr([0x02, 0, 0, 0, 2, 1]);

const HOST_A: Ipv4Addr = Ipv4Addr::new(10, 0, 1, 100);
const HOST_A_MAC: MacAddr = MacAddr([0x02, 0xaa, 0, 0, 1, 100]);
const HOST_B: Ipv4Addr = Ipv4Addr::new(10, 0, 2, 100);
const HOST_B_MAC: MacAddr = MacAddr([0x02, 0xbb, 0, 0, 2, 100]);
const GATEWAY: Ipv4Addr = Ipv4Addr::new(10, 0, 2, 254);

const UDP_PAYLOAD: [u8; 16] = [
    0x30, 0x39, 0x00, 0x35, 0x00, 0x10, 0x00, 0x00, b'q', b'u', b'e', b'r', b'y', b'!', b'!', b'!',
];

fn setup() -> (Arc<Router>, Arc<RecordingTransport>) {
    let transport = Arc::new(RecordingTransport::new());
    let interfaces = InterfaceTable::new(vec![
        Interface::new("eth1", ETH1_IP, ETH1_MAC),
        Interface::new("eth2", ETH2_IP, ETH2_MAC),
    ]);
    let routes = RoutingTable::new(vec![
        Route::new(
            Ipv4Addr::new(10, 0, 1, 0),
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::UNSPECIFIED,
            "eth1",
        ),
        Route::new(
            Ipv4Addr::new(10, 0, 2, 0),
            Ipv4Addr::new(255, 255, 255, 0),
            Ipv4Addr::UNSPECIFIED,
            "eth2",
        ),
        Route::new(
            Ipv4Addr::new(172, 16, 0, 0),
            Ipv4Addr::new(255, 255, 0, 0),
            GATEWAY,
            "eth2",
        ),
    ]);
    let router = Router::new(
        interfaces,
        routes,
        ArpCacheConfig::default(),
        transport.clone(),
        Arc::new(MetricsRegistry::new()),
    );
    (Arc::new(router), transport)
}

fn ip_frame(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, ttl: u8, payload: &[u8]) -> Vec<u8> {
    let packet = Ipv4Builder::new(protocol, src, dst).ttl(ttl).build(payload);
    FrameBuilder::new(EtherType::Ipv4)
        .dst_mac(ETH1_MAC)
        .src_mac(HOST_A_MAC)
        .build(&packet)
}

fn udp_from_a(dst: Ipv4Addr, ttl: u8) -> Vec<u8> {
    ip_frame(HOST_A, dst, ipv4::protocol::UDP, ttl, &UDP_PAYLOAD)
}

fn arp_reply(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_mac: MacAddr, target_ip: Ipv4Addr) -> Vec<u8> {
    let reply = ArpPacket::reply(sender_mac, sender_ip, target_mac, target_ip);
    FrameBuilder::new(EtherType::Arp)
        .dst_mac(target_mac)
        .src_mac(sender_mac)
        .build(&reply.to_bytes())
}

/// Teach the router host A's binding without any transmission
fn learn_host_a(router: &Router) {
    router.handle_frame(&arp_reply(HOST_A_MAC, HOST_A, ETH1_MAC, ETH1_IP), "eth1");
}

fn learn_host_b(router: &Router) {
    router.handle_frame(&arp_reply(HOST_B_MAC, HOST_B, ETH2_MAC, ETH2_IP), "eth2");
}

/// Decode an ICMP datagram sent by the router
fn icmp_of(sent: &SentFrame) -> (Ipv4Addr, Ipv4Addr, u8, u8, Vec<u8>) {
    let eth = Frame::parse(&sent.frame).unwrap();
    assert_eq!(eth.ethertype(), EtherType::Ipv4 as u16);
    let ip = Ipv4Header::parse(eth.payload()).unwrap();
    assert!(ip.validate_checksum());
    assert_eq!(ip.protocol(), ipv4::protocol::ICMP);
    assert_eq!(ip.ttl(), ipv4::DEFAULT_TTL);
    let message = IcmpPacket::parse(ip.payload()).unwrap();
    assert!(message.validate_checksum());
    (
        ip.src_addr(),
        ip.dst_addr(),
        message.icmp_type(),
        message.code(),
        message.body().to_vec(),
    )
}

fn arp_of(sent: &SentFrame) -> ArpPacket {
    let eth = Frame::parse(&sent.frame).unwrap();
    assert_eq!(eth.ethertype(), EtherType::Arp as u16);
    ArpPacket::parse(eth.payload()).unwrap()
}

#[test]
fn test_runt_frames_are_dropped() {
    let (router, transport) = setup();
    for len in [0, 1, 13] {
        router.handle_frame(&vec![0xffu8; len], "eth1");
    }
    assert!(transport.is_empty());
    assert_eq!(router.metrics().frames_malformed.get(), 3);
}

#[test]
fn test_truncated_ipv4_is_dropped_silently() {
    let (router, transport) = setup();
    let frame = udp_from_a(HOST_B, 64);
    router.handle_frame(&frame[..14 + 19], "eth1");
    assert!(transport.is_empty());
}

#[test]
fn test_ttl_expired_sends_one_time_exceeded() {
    let (router, transport) = setup();
    learn_host_a(&router);

    let frame = udp_from_a(HOST_B, 1);
    router.handle_frame(&frame, "eth1");

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].interface, "eth1");
    assert_eq!(Frame::parse(&sent[0].frame).unwrap().dst_mac(), HOST_A_MAC);

    let (src, dst, icmp_type, code, body) = icmp_of(&sent[0]);
    assert_eq!(src, ETH1_IP);
    assert_eq!(dst, HOST_A);
    assert_eq!(icmp_type, IcmpType::TimeExceeded as u8);
    assert_eq!(code, icmp::time_exceeded::TTL_EXCEEDED);
    // unused word, original header, first 8 payload bytes
    assert_eq!(&body[..4], &[0; 4]);
    assert_eq!(&body[4..24], &frame[14..34]);
    assert_eq!(&body[24..], &UDP_PAYLOAD[..8]);
}

#[test]
fn test_time_exceeded_quotes_header_options() {
    let (router, transport) = setup();
    learn_host_a(&router);

    let mut packet = vec![
        0x46, 0x00, 0x00, 0x00, 0x00, 0x01, 0x40, 0x00, 0x01, ipv4::protocol::UDP, 0x00, 0x00,
    ];
    packet.extend_from_slice(&HOST_A.octets());
    packet.extend_from_slice(&HOST_B.octets());
    packet.extend_from_slice(&[0x01, 0x01, 0x01, 0x00]);
    packet.extend_from_slice(&UDP_PAYLOAD);
    let total = packet.len() as u16;
    packet[2..4].copy_from_slice(&total.to_be_bytes());
    let sum = checksum(&packet[..24]);
    packet[10..12].copy_from_slice(&sum.to_be_bytes());

    let frame = FrameBuilder::new(EtherType::Ipv4)
        .dst_mac(ETH1_MAC)
        .src_mac(HOST_A_MAC)
        .build(&packet);
    router.handle_frame(&frame, "eth1");

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    let (_, _, icmp_type, _, body) = icmp_of(&sent[0]);
    assert_eq!(icmp_type, IcmpType::TimeExceeded as u8);
    assert_eq!(body.len(), 4 + 24 + 8);
    assert_eq!(&body[4..28], &packet[..24]);
}

#[test]
fn test_no_route_sends_net_unreachable() {
    let (router, transport) = setup();
    learn_host_a(&router);

    router.handle_frame(&udp_from_a(Ipv4Addr::new(8, 8, 8, 8), 64), "eth1");

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    let (src, dst, icmp_type, code, body) = icmp_of(&sent[0]);
    assert_eq!(src, ETH1_IP);
    assert_eq!(dst, HOST_A);
    assert_eq!(icmp_type, IcmpType::DestinationUnreachable as u8);
    assert_eq!(code, icmp::dest_unreachable::NET_UNREACHABLE);
    let quoted = Ipv4Header::parse(&body[4..]).unwrap();
    assert_eq!(quoted.dst_addr(), Ipv4Addr::new(8, 8, 8, 8));
}

#[test]
fn test_forward_with_cached_next_hop() {
    let (router, transport) = setup();
    learn_host_b(&router);

    let frame = udp_from_a(HOST_B, 64);
    router.handle_frame(&frame, "eth1");

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].interface, "eth2");

    let eth = Frame::parse(&sent[0].frame).unwrap();
    assert_eq!(eth.src_mac(), ETH2_MAC);
    assert_eq!(eth.dst_mac(), HOST_B_MAC);
    let ip = Ipv4Header::parse(eth.payload()).unwrap();
    assert_eq!(ip.ttl(), 63);
    assert!(ip.validate_checksum());
    assert_eq!(ip.src_addr(), HOST_A);
    assert_eq!(ip.dst_addr(), HOST_B);
    assert_eq!(ip.payload(), &UDP_PAYLOAD);
    assert_eq!(router.metrics().packets_forwarded.get(), 1);
}

#[test]
fn test_route_via_gateway_resolves_gateway() {
    let (router, transport) = setup();

    router.handle_frame(&udp_from_a(Ipv4Addr::new(172, 16, 9, 9), 64), "eth1");

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].interface, "eth2");
    let request = arp_of(&sent[0]);
    assert_eq!(request.operation, ArpOp::Request);
    assert_eq!(request.target_ip, GATEWAY);
    assert!(router.cache().has_pending(GATEWAY));
}

#[test]
fn test_resolution_flushes_queue_in_order() {
    let (router, transport) = setup();

    let frames: Vec<Vec<u8>> = (0..3)
        .map(|i| {
            let mut payload = UDP_PAYLOAD;
            payload[15] = i;
            ip_frame(HOST_A, HOST_B, ipv4::protocol::UDP, 64, &payload)
        })
        .collect();
    for frame in &frames {
        router.handle_frame(frame, "eth1");
    }

    // exactly one broadcast request for the three frames
    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].interface, "eth2");
    assert_eq!(
        Frame::parse(&sent[0].frame).unwrap().dst_mac(),
        MacAddr::BROADCAST
    );
    let request = arp_of(&sent[0]);
    assert_eq!(request.sender_ip, ETH2_IP);
    assert_eq!(request.sender_mac, ETH2_MAC);
    assert_eq!(request.target_ip, HOST_B);
    assert_eq!(router.cache().queued_len(HOST_B), 3);

    learn_host_b(&router);

    let sent = transport.take();
    assert_eq!(sent.len(), 3);
    for (i, out) in sent.iter().enumerate() {
        assert_eq!(out.interface, "eth2");
        let eth = Frame::parse(&out.frame).unwrap();
        assert_eq!(eth.dst_mac(), HOST_B_MAC);
        assert_eq!(eth.src_mac(), ETH2_MAC);
        let ip = Ipv4Header::parse(eth.payload()).unwrap();
        assert_eq!(ip.payload()[15], i as u8);
        assert_eq!(ip.ttl(), 63);
    }
    assert!(!router.cache().has_pending(HOST_B));

    // a duplicate reply releases nothing
    learn_host_b(&router);
    assert!(transport.is_empty());
}

#[test]
fn test_unanswered_arp_reports_host_unreachable() {
    let (router, transport) = setup();
    learn_host_a(&router);

    let start = Instant::now();
    router.handle_frame(&udp_from_a(HOST_B, 64), "eth1");
    router.handle_frame(&udp_from_a(HOST_B, 32), "eth1");
    assert_eq!(transport.take().len(), 1);

    for k in 1..=4u64 {
        router.sweep_at(start + Duration::from_millis(k * 1000 + 500));
        let sent = transport.take();
        assert_eq!(sent.len(), 1, "retransmission {}", k);
        assert_eq!(arp_of(&sent[0]).target_ip, HOST_B);
    }
    assert_eq!(router.cache().times_sent(HOST_B), Some(5));

    router.sweep_at(start + Duration::from_millis(5500));
    let sent = transport.take();
    assert_eq!(sent.len(), 2);
    for out in &sent {
        assert_eq!(out.interface, "eth1");
        let (src, dst, icmp_type, code, body) = icmp_of(out);
        assert_eq!(src, ETH1_IP);
        assert_eq!(dst, HOST_A);
        assert_eq!(icmp_type, IcmpType::DestinationUnreachable as u8);
        assert_eq!(code, icmp::dest_unreachable::HOST_UNREACHABLE);
        assert_eq!(Ipv4Header::parse(&body[4..]).unwrap().dst_addr(), HOST_B);
    }
    assert!(!router.cache().has_pending(HOST_B));
    assert_eq!(router.metrics().arp_resolution_failures.get(), 1);

    // nothing left to retry
    router.sweep_at(start + Duration::from_millis(6500));
    assert!(transport.is_empty());
}

#[test]
fn test_no_error_for_router_originated_traffic() {
    let (router, transport) = setup();

    // time exceeded toward an unresolved host A
    let start = Instant::now();
    router.handle_frame(&udp_from_a(HOST_B, 1), "eth1");
    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(arp_of(&sent[0]).target_ip, HOST_A);

    for k in 1..=5u64 {
        router.sweep_at(start + Duration::from_millis(k * 1000 + 500));
    }
    let sent = transport.take();
    // four retransmissions and no host unreachable about our own message
    assert_eq!(sent.len(), 4);
    assert!(sent
        .iter()
        .all(|s| Frame::parse(&s.frame).unwrap().ethertype() == EtherType::Arp as u16));
    assert_eq!(router.metrics().arp_resolution_failures.get(), 1);
    assert_eq!(router.metrics().icmp_host_unreachable.get(), 0);
}

#[test]
fn test_echo_request_to_router() {
    let (router, transport) = setup();
    learn_host_a(&router);

    let body = [0x12, 0x34, 0x00, 0x01, b'p', b'i', b'n', b'g', 0, 1, 2, 3];
    let echo = icmp::build_message(IcmpType::EchoRequest, 0, &body);
    // addressed to the far interface
    router.handle_frame(
        &ip_frame(HOST_A, ETH2_IP, ipv4::protocol::ICMP, 64, &echo),
        "eth1",
    );

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].interface, "eth1");
    let (src, dst, icmp_type, code, reply_body) = icmp_of(&sent[0]);
    assert_eq!(src, ETH2_IP);
    assert_eq!(dst, HOST_A);
    assert_eq!(icmp_type, IcmpType::EchoReply as u8);
    assert_eq!(code, 0);
    assert_eq!(reply_body, body);
}

#[test]
fn test_echo_with_ttl_one_to_router_is_answered() {
    let (router, transport) = setup();
    learn_host_a(&router);

    let echo = icmp::build_message(IcmpType::EchoRequest, 0, &[0, 1, 0, 1]);
    router.handle_frame(
        &ip_frame(HOST_A, ETH1_IP, ipv4::protocol::ICMP, 1, &echo),
        "eth1",
    );

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(icmp_of(&sent[0]).2, IcmpType::EchoReply as u8);
}

#[test]
fn test_other_icmp_to_router_is_ignored() {
    let (router, transport) = setup();
    learn_host_a(&router);

    let reply = icmp::build_message(IcmpType::EchoReply, 0, &[0, 1, 0, 1]);
    router.handle_frame(
        &ip_frame(HOST_A, ETH1_IP, ipv4::protocol::ICMP, 64, &reply),
        "eth1",
    );
    assert!(transport.is_empty());
}

#[test]
fn test_udp_to_router_sends_port_unreachable() {
    let (router, transport) = setup();
    learn_host_a(&router);

    let frame = udp_from_a(ETH1_IP, 64);
    router.handle_frame(&frame, "eth1");

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    let (src, dst, icmp_type, code, body) = icmp_of(&sent[0]);
    assert_eq!(src, ETH1_IP);
    assert_eq!(dst, HOST_A);
    assert_eq!(icmp_type, IcmpType::DestinationUnreachable as u8);
    assert_eq!(code, icmp::dest_unreachable::PORT_UNREACHABLE);
    assert_eq!(&body[4..24], &frame[14..34]);
    assert_eq!(&body[24..], &UDP_PAYLOAD[..8]);
    assert_eq!(router.metrics().icmp_port_unreachable.get(), 1);
}

#[test]
fn test_arp_request_for_other_host_is_ignored() {
    let (router, transport) = setup();
    let request = ArpPacket::request(HOST_A_MAC, HOST_A, Ipv4Addr::new(10, 0, 1, 50));
    let frame = FrameBuilder::new(EtherType::Arp)
        .dst_mac(MacAddr::BROADCAST)
        .src_mac(HOST_A_MAC)
        .build(&request.to_bytes());

    router.handle_frame(&frame, "eth1");

    assert!(transport.is_empty());
    assert!(router.cache().lookup(HOST_A).is_none());
}

#[test]
fn test_arp_request_for_router_is_answered() {
    let (router, transport) = setup();
    let request = ArpPacket::request(HOST_B_MAC, HOST_B, ETH2_IP);
    let frame = FrameBuilder::new(EtherType::Arp)
        .dst_mac(MacAddr::BROADCAST)
        .src_mac(HOST_B_MAC)
        .build(&request.to_bytes());

    router.handle_frame(&frame, "eth2");

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].interface, "eth2");
    let reply = arp_of(&sent[0]);
    assert_eq!(reply.operation, ArpOp::Reply);
    assert_eq!(reply.sender_ip, ETH2_IP);
    assert_eq!(reply.sender_mac, ETH2_MAC);
    assert_eq!(reply.target_ip, HOST_B);
    assert_eq!(reply.target_mac, HOST_B_MAC);
    assert_eq!(router.cache().lookup(HOST_B), Some(HOST_B_MAC));
}

#[test]
fn test_concurrent_receivers_share_one_request() {
    let (router, transport) = setup();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                for _ in 0..5 {
                    router.handle_frame(&udp_from_a(HOST_B, 64), "eth1");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(router.cache().queued_len(HOST_B), 20);

    learn_host_b(&router);
    assert_eq!(transport.take().len(), 20);
}
