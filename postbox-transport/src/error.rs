//! Error types for the postbox messaging layer.

use crate::wire::WireError;
use crate::{NetworkAddress, UID};

/// Errors that can occur in the messaging layer.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// No mailbox is registered for the given token.
    #[error("endpoint not found: {token}")]
    EndpointNotFound {
        /// The token that was not found.
        token: UID,
    },

    /// An incoming payload did not decode to the mailbox's argument list.
    #[error("deserialization failed: {message}")]
    DeserializationFailed {
        /// Details about the deserialization failure.
        message: String,
    },

    /// Outgoing arguments could not be encoded.
    #[error("serialization failed: {message}")]
    SerializationFailed {
        /// Details about the serialization failure.
        message: String,
    },

    /// The destination inbox is full.
    #[error("queue full: capacity {capacity}")]
    QueueFull {
        /// Maximum capacity of the inbox.
        capacity: usize,
    },

    /// The destination address is nil.
    #[error("cannot send to a nil address")]
    NilAddress,

    /// No live peer owns the destination address.
    #[error("peer unreachable: {address}")]
    PeerUnreachable {
        /// The destination peer.
        address: NetworkAddress,
    },

    /// Packet framing failed.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Transport is closed or shutting down.
    #[error("transport closed")]
    TransportClosed,
}
