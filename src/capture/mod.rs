//! Frame transport
//!
//! The router core hands finished frames to a [`Transport`]. The daemon backs
//! it with one AF_PACKET socket per interface; tests record frames in memory.

mod af_packet;

pub use af_packet::AfPacketSocket;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{trace, warn};

/// Outbound half of the link layer.
///
/// Transmission is fire-and-forget: implementations log failures rather than
/// report them, and must not block the caller.
pub trait Transport: Send + Sync {
    fn transmit(&self, frame: &[u8], interface: &str);
}

/// Transport over AF_PACKET sockets keyed by interface name
#[derive(Default)]
pub struct SocketTransport {
    sockets: HashMap<String, Arc<AfPacketSocket>>,
}

impl SocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, interface: impl Into<String>, socket: Arc<AfPacketSocket>) {
        self.sockets.insert(interface.into(), socket);
    }

    pub fn get(&self, interface: &str) -> Option<&Arc<AfPacketSocket>> {
        self.sockets.get(interface)
    }
}

impl Transport for SocketTransport {
    fn transmit(&self, frame: &[u8], interface: &str) {
        let Some(socket) = self.sockets.get(interface) else {
            warn!("No socket for interface {}, dropping {} bytes", interface, frame.len());
            return;
        };
        match socket.send(frame) {
            Ok(n) => trace!("Sent {} bytes on {}", n, interface),
            Err(e) => warn!("Failed to send on {}: {}", interface, e),
        }
    }
}

/// Frame captured by [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub interface: String,
    pub frame: Vec<u8>,
}

/// In-memory transport that keeps every frame in transmission order
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentFrame>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent so far
    pub fn sent(&self) -> Vec<SentFrame> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the recorded frames
    pub fn take(&self) -> Vec<SentFrame> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for RecordingTransport {
    fn transmit(&self, frame: &[u8], interface: &str) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentFrame {
                interface: interface.to_string(),
                frame: frame.to_vec(),
            });
    }
}
