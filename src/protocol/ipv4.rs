//! IPv4 header handling (RFC 791)

use super::checksum::checksum;
use crate::{Error, Result};
use std::net::Ipv4Addr;

/// Header size without options
pub const MIN_HEADER_SIZE: usize = 20;

/// Default TTL for locally originated datagrams
pub const DEFAULT_TTL: u8 = 64;

const FLAG_DONT_FRAGMENT: u16 = 0x4000;

/// IP protocol numbers the router inspects
pub mod protocol {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

fn check_header(buffer: &[u8]) -> Result<usize> {
    if buffer.len() < MIN_HEADER_SIZE {
        return Err(Error::truncated("IPv4 header", buffer.len(), MIN_HEADER_SIZE));
    }
    let version = buffer[0] >> 4;
    if version != 4 {
        return Err(Error::Unsupported(format!("IP version {version}")));
    }
    let header_len = usize::from(buffer[0] & 0x0f) * 4;
    if header_len < MIN_HEADER_SIZE {
        return Err(Error::Unsupported(format!("IPv4 header length {header_len}")));
    }
    if buffer.len() < header_len {
        return Err(Error::truncated("IPv4 header with options", buffer.len(), header_len));
    }
    Ok(header_len)
}

/// Read-only view over an IPv4 datagram
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Header<'a> {
    buffer: &'a [u8],
    header_len: usize,
}

impl<'a> Ipv4Header<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        let header_len = check_header(buffer)?;
        Ok(Self { buffer, header_len })
    }

    pub fn ihl(&self) -> u8 {
        self.buffer[0] & 0x0f
    }

    /// `ihl * 4`, options included
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn total_length(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    pub fn ttl(&self) -> u8 {
        self.buffer[8]
    }

    pub fn protocol(&self) -> u8 {
        self.buffer[9]
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.buffer[10], self.buffer[11]])
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        addr_at(self.buffer, 12)
    }

    pub fn dst_addr(&self) -> Ipv4Addr {
        addr_at(self.buffer, 16)
    }

    pub fn dont_fragment(&self) -> bool {
        u16::from_be_bytes([self.buffer[6], self.buffer[7]]) & FLAG_DONT_FRAGMENT != 0
    }

    pub fn validate_checksum(&self) -> bool {
        checksum(self.header_bytes()) == 0
    }

    /// Header bytes including options
    pub fn header_bytes(&self) -> &'a [u8] {
        &self.buffer[..self.header_len]
    }

    /// Payload bounded by the total length field.
    ///
    /// Link-layer padding past `total_length` is excluded; a total length
    /// that disagrees with the buffer falls back to the buffer end.
    pub fn payload(&self) -> &'a [u8] {
        let total = usize::from(self.total_length());
        let end = if (self.header_len..=self.buffer.len()).contains(&total) {
            total
        } else {
            self.buffer.len()
        };
        &self.buffer[self.header_len..end]
    }
}

/// Mutable view used for in-place header edits while forwarding
#[derive(Debug)]
pub struct Ipv4HeaderMut<'a> {
    buffer: &'a mut [u8],
    header_len: usize,
}

impl<'a> Ipv4HeaderMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Result<Self> {
        let header_len = check_header(buffer)?;
        Ok(Self { buffer, header_len })
    }

    pub fn ttl(&self) -> u8 {
        self.buffer[8]
    }

    /// Set the TTL and recompute the header checksum
    pub fn set_ttl(&mut self, ttl: u8) {
        self.buffer[8] = ttl;
        self.update_checksum();
    }

    /// Recompute the checksum over the full header, options included
    pub fn update_checksum(&mut self) {
        self.buffer[10..12].fill(0);
        let sum = checksum(&self.buffer[..self.header_len]);
        self.buffer[10..12].copy_from_slice(&sum.to_be_bytes());
    }
}

fn addr_at(buffer: &[u8], offset: usize) -> Ipv4Addr {
    Ipv4Addr::new(
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    )
}

/// Builds an option-less IPv4 datagram for locally originated traffic
#[derive(Debug, Clone)]
pub struct Ipv4Builder {
    ttl: u8,
    protocol: u8,
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
}

impl Ipv4Builder {
    pub fn new(protocol: u8, src_addr: Ipv4Addr, dst_addr: Ipv4Addr) -> Self {
        Self {
            ttl: DEFAULT_TTL,
            protocol,
            src_addr,
            dst_addr,
        }
    }

    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    /// Version 4, IHL 5, DF set, checksum filled in
    pub fn build(self, payload: &[u8]) -> Vec<u8> {
        let total_length = u16::try_from(MIN_HEADER_SIZE + payload.len()).unwrap_or(u16::MAX);
        let mut buffer = vec![0u8; MIN_HEADER_SIZE];

        buffer[0] = 0x45;
        buffer[2..4].copy_from_slice(&total_length.to_be_bytes());
        buffer[6..8].copy_from_slice(&FLAG_DONT_FRAGMENT.to_be_bytes());
        buffer[8] = self.ttl;
        buffer[9] = self.protocol;
        buffer[12..16].copy_from_slice(&self.src_addr.octets());
        buffer[16..20].copy_from_slice(&self.dst_addr.octets());

        let sum = checksum(&buffer);
        buffer[10..12].copy_from_slice(&sum.to_be_bytes());

        buffer.extend_from_slice(payload);
        buffer
    }
}
