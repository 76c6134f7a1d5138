//! Untyped mailboxes.
//!
//! A [`RawMailbox`] is a token registered on a [`MailboxTransport`] together
//! with a receive callback. The callback gets the raw payload bytes and a
//! [`Receipt`]; calling [`Receipt::done`] tells the transport the delivery is
//! accounted for. Everything typed is layered on top of this.

mod endpoint_map;

use std::rc::Rc;

pub use endpoint_map::EndpointMap;

use crate::transport::{MailboxTransport, TransportStats};
use crate::{Endpoint, MessagingError, UID};

/// Receives payloads dispatched by the transport.
///
/// `receive` is called synchronously while the transport drains its inbox.
/// Returning an error marks the delivery as failed; the message is dropped.
pub trait MessageReceiver {
    /// Process one incoming payload.
    fn receive(&self, payload: &[u8], receipt: Receipt) -> Result<(), MessagingError>;
}

impl<F> MessageReceiver for F
where
    F: Fn(&[u8], Receipt) -> Result<(), MessagingError>,
{
    fn receive(&self, payload: &[u8], receipt: Receipt) -> Result<(), MessagingError> {
        self(payload, receipt)
    }
}

/// Completion signal for one delivered packet.
#[must_use = "a receipt that is never done leaves the delivery unaccounted for"]
pub struct Receipt {
    token: UID,
    stats: Rc<TransportStats>,
}

impl Receipt {
    pub(crate) fn new(token: UID, stats: Rc<TransportStats>) -> Self {
        Self { token, stats }
    }

    /// Token of the mailbox the packet was delivered to.
    pub fn token(&self) -> UID {
        self.token
    }

    /// Acknowledge the delivery.
    pub fn done(self) {
        self.stats.record_receipt();
        tracing::trace!(token = %self.token, "receipt acknowledged");
    }
}

/// A registered endpoint with a byte-level receive callback.
///
/// Unregisters itself from the transport when dropped. Packets that arrive
/// afterwards are counted as undelivered.
pub struct RawMailbox {
    transport: Rc<MailboxTransport>,
    endpoint: Endpoint,
}

impl RawMailbox {
    /// Register `callback` on `transport` under a fresh token.
    pub fn new<F>(transport: &Rc<MailboxTransport>, callback: F) -> Self
    where
        F: Fn(&[u8], Receipt) -> Result<(), MessagingError> + 'static,
    {
        Self::with_receiver(transport, Rc::new(callback))
    }

    /// Register an existing receiver on `transport` under a fresh token.
    pub fn with_receiver(
        transport: &Rc<MailboxTransport>,
        receiver: Rc<dyn MessageReceiver>,
    ) -> Self {
        let endpoint = transport.register(receiver);
        Self {
            transport: Rc::clone(transport),
            endpoint,
        }
    }

    /// Address other peers use to reach this mailbox.
    pub fn address(&self) -> Endpoint {
        self.endpoint.clone()
    }

    /// Transport this mailbox is registered on.
    pub fn transport(&self) -> &Rc<MailboxTransport> {
        &self.transport
    }
}

impl Drop for RawMailbox {
    fn drop(&mut self) {
        self.transport.unregister(&self.endpoint.token);
    }
}
