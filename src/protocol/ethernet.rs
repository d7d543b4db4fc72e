//! Ethernet II framing

use super::{EtherType, MacAddr};
use crate::{Error, Result};

/// Ethernet header length (dst MAC, src MAC, EtherType)
pub const HEADER_LEN: usize = 14;

const DST: std::ops::Range<usize> = 0..6;
const SRC: std::ops::Range<usize> = 6..12;
const TYPE: std::ops::Range<usize> = 12..14;

/// Read-only view over an Ethernet frame
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    buffer: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn parse(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_LEN {
            return Err(Error::truncated("Ethernet frame", buffer.len(), HEADER_LEN));
        }
        Ok(Self { buffer })
    }

    pub fn dst_mac(&self) -> MacAddr {
        MacAddr(array(&self.buffer[DST]))
    }

    pub fn src_mac(&self) -> MacAddr {
        MacAddr(array(&self.buffer[SRC]))
    }

    pub fn ethertype(&self) -> u16 {
        u16::from_be_bytes([self.buffer[TYPE.start], self.buffer[TYPE.start + 1]])
    }

    pub fn payload(&self) -> &'a [u8] {
        &self.buffer[HEADER_LEN..]
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.buffer
    }
}

/// Mutable view used to rewrite addresses of a frame in place
#[derive(Debug)]
pub struct FrameMut<'a> {
    buffer: &'a mut [u8],
}

impl<'a> FrameMut<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Result<Self> {
        if buffer.len() < HEADER_LEN {
            return Err(Error::truncated("Ethernet frame", buffer.len(), HEADER_LEN));
        }
        Ok(Self { buffer })
    }

    pub fn set_dst_mac(&mut self, mac: MacAddr) {
        self.buffer[DST].copy_from_slice(&mac.0);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        self.buffer[SRC].copy_from_slice(&mac.0);
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer[HEADER_LEN..]
    }
}

fn array(bytes: &[u8]) -> [u8; 6] {
    let mut out = [0u8; 6];
    out.copy_from_slice(bytes);
    out
}

/// Builds a new Ethernet frame from scratch
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    dst: MacAddr,
    src: MacAddr,
    ethertype: u16,
}

impl FrameBuilder {
    pub fn new(ethertype: EtherType) -> Self {
        Self {
            dst: MacAddr::ZERO,
            src: MacAddr::ZERO,
            ethertype: ethertype as u16,
        }
    }

    pub fn dst_mac(mut self, mac: MacAddr) -> Self {
        self.dst = mac;
        self
    }

    pub fn src_mac(mut self, mac: MacAddr) -> Self {
        self.src = mac;
        self
    }

    pub fn build(self, payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(&self.dst.0);
        frame.extend_from_slice(&self.src.0);
        frame.extend_from_slice(&self.ethertype.to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }
}
