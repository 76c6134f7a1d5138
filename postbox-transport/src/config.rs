//! Configuration for a [`MailboxTransport`](crate::MailboxTransport).

use crate::wire::MAX_PAYLOAD_SIZE;

/// Limits applied by a transport to the packets it sends and queues.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Largest payload accepted by `send`, in bytes. Capped at
    /// [`MAX_PAYLOAD_SIZE`] by the wire format.
    pub max_payload_size: usize,

    /// Maximum number of packets waiting in the inbox before senders get
    /// `QueueFull`.
    pub inbox_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_payload_size: 1024 * 1024,
            inbox_capacity: 1024,
        }
    }
}

impl TransportConfig {
    /// Create a configuration with the given limits.
    pub fn new(max_payload_size: usize, inbox_capacity: usize) -> Self {
        Self {
            max_payload_size: max_payload_size.min(MAX_PAYLOAD_SIZE),
            inbox_capacity,
        }
    }

    /// Set the inbox capacity.
    pub fn with_inbox_capacity(mut self, inbox_capacity: usize) -> Self {
        self.inbox_capacity = inbox_capacity;
        self
    }

    /// Set the payload limit.
    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size.min(MAX_PAYLOAD_SIZE);
        self
    }

    /// Small messages, shallow inbox. Backs up quickly so tests notice.
    pub fn local_network() -> Self {
        Self {
            max_payload_size: 64 * 1024,
            inbox_capacity: 128,
        }
    }

    /// Large payloads and a deep inbox.
    pub fn bulk() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
            inbox_capacity: 64 * 1024,
        }
    }
}
