//! ICMP messages (RFC 792)

use super::checksum::checksum;
use crate::{Error, Result};

/// Type, code and checksum
pub const ICMP_HEADER_SIZE: usize = 4;

/// Payload bytes of the offending datagram quoted in error messages
pub const QUOTED_PAYLOAD_LEN: usize = 8;

/// ICMP message types the router emits or answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IcmpType {
    EchoReply = 0,
    DestinationUnreachable = 3,
    EchoRequest = 8,
    TimeExceeded = 11,
}

impl IcmpType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(IcmpType::EchoReply),
            3 => Some(IcmpType::DestinationUnreachable),
            8 => Some(IcmpType::EchoRequest),
            11 => Some(IcmpType::TimeExceeded),
            _ => None,
        }
    }
}

/// Destination Unreachable codes
pub mod dest_unreachable {
    pub const NET_UNREACHABLE: u8 = 0;
    pub const HOST_UNREACHABLE: u8 = 1;
    pub const PORT_UNREACHABLE: u8 = 3;
}

/// Time Exceeded codes
pub mod time_exceeded {
    pub const TTL_EXCEEDED: u8 = 0;
}

/// Read-only view over an ICMP message
#[derive(Debug, Clone, Copy)]
pub struct IcmpPacket<'a> {
    buffer: &'a [u8],
}

impl<'a> IcmpPacket<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < ICMP_HEADER_SIZE {
            return Err(Error::truncated("ICMP message", buffer.len(), ICMP_HEADER_SIZE));
        }
        Ok(Self { buffer })
    }

    pub fn icmp_type(&self) -> u8 {
        self.buffer[0]
    }

    pub fn code(&self) -> u8 {
        self.buffer[1]
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    pub fn is_echo_request(&self) -> bool {
        self.icmp_type() == IcmpType::EchoRequest as u8
    }

    /// Everything after the checksum: identifier, sequence and data for echo
    /// messages, unused word plus quoted datagram for errors
    pub fn body(&self) -> &'a [u8] {
        &self.buffer[ICMP_HEADER_SIZE..]
    }

    pub fn validate_checksum(&self) -> bool {
        checksum(self.buffer) == 0
    }
}

/// Build a message whose body is carried verbatim (echo reply)
pub fn build_message(icmp_type: IcmpType, code: u8, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(ICMP_HEADER_SIZE + body.len());
    message.extend_from_slice(&[icmp_type as u8, code, 0, 0]);
    message.extend_from_slice(body);
    finish(message)
}

/// Build an error message quoting the offending datagram.
///
/// Layout: header, four unused bytes, the original IP header as long as its
/// IHL says, then at most [`QUOTED_PAYLOAD_LEN`] bytes of its payload.
pub fn build_error(icmp_type: IcmpType, code: u8, ip_header: &[u8], ip_payload: &[u8]) -> Vec<u8> {
    let quoted = &ip_payload[..ip_payload.len().min(QUOTED_PAYLOAD_LEN)];
    let mut message = Vec::with_capacity(ICMP_HEADER_SIZE + 4 + ip_header.len() + quoted.len());
    message.extend_from_slice(&[icmp_type as u8, code, 0, 0]);
    message.extend_from_slice(&[0; 4]);
    message.extend_from_slice(ip_header);
    message.extend_from_slice(quoted);
    finish(message)
}

fn finish(mut message: Vec<u8>) -> Vec<u8> {
    message[2..4].fill(0);
    let sum = checksum(&message);
    message[2..4].copy_from_slice(&sum.to_be_bytes());
    message
}
