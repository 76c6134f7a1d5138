//! MailboxTransport: the transport link of one peer.
//!
//! Owns the peer's endpoint map and inbox. Sending is synchronous: the
//! payload is written, framed and queued on the destination peer's inbox
//! before `send` returns, and nothing on the send path ever awaits.
//! Delivery happens when the owner drains the inbox with
//! [`MailboxTransport::pump`] or drives [`MailboxTransport::run`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tokio::sync::Notify;

use crate::config::TransportConfig;
use crate::mailbox::{EndpointMap, MessageReceiver, Receipt};
use crate::network::LoopbackNetwork;
use crate::wire;
use crate::{CodecError, Endpoint, MessagingError, NetworkAddress, UID};

/// Mutable transport state.
struct TransportData {
    /// Registered mailboxes.
    endpoints: EndpointMap,
    /// Framed packets waiting for delivery, oldest first.
    inbox: VecDeque<Vec<u8>>,
    /// Last token counter handed out; tokens start at 1.
    last_token: u64,
    /// Sequence number for the next outgoing packet.
    next_sequence: u64,
    /// Set by `close`; no more packets are accepted.
    closed: bool,
}

/// Delivery statistics.
///
/// Shared with every [`Receipt`] so acknowledgments can be counted without
/// borrowing the transport.
#[derive(Debug, Default)]
pub(crate) struct TransportStats {
    packets_sent: Cell<u64>,
    packets_delivered: Cell<u64>,
    packets_undelivered: Cell<u64>,
    receipts_acknowledged: Cell<u64>,
    receive_failures: Cell<u64>,
}

fn bump(counter: &Cell<u64>) {
    counter.set(counter.get() + 1);
}

impl TransportStats {
    pub(crate) fn record_receipt(&self) {
        bump(&self.receipts_acknowledged);
    }
}

/// Transport link for one peer.
///
/// Shared as `Rc<MailboxTransport>`; the runtime is single-threaded.
pub struct MailboxTransport {
    data: RefCell<TransportData>,
    stats: Rc<TransportStats>,
    local_address: NetworkAddress,
    network: LoopbackNetwork,
    config: TransportConfig,
    /// Random per-transport prefix of every token, so tokens of a restarted
    /// peer do not collide with addresses still held by others.
    incarnation: u64,
    wake: Notify,
}

impl MailboxTransport {
    /// Create a transport for `local_address` and attach it to `network`.
    pub fn new(
        local_address: NetworkAddress,
        network: &LoopbackNetwork,
        config: TransportConfig,
    ) -> Rc<Self> {
        let transport = Rc::new(Self {
            data: RefCell::new(TransportData {
                endpoints: EndpointMap::new(),
                inbox: VecDeque::new(),
                last_token: 0,
                next_sequence: 0,
                closed: false,
            }),
            stats: Rc::new(TransportStats::default()),
            local_address,
            network: network.clone(),
            config,
            incarnation: rand::random(),
            wake: Notify::new(),
        });
        network.attach(&transport);
        transport
    }

    /// Create a transport on a private network of its own.
    ///
    /// Only local mailboxes are reachable.
    pub fn standalone(local_address: NetworkAddress) -> Rc<Self> {
        Self::new(
            local_address,
            &LoopbackNetwork::new(),
            TransportConfig::default(),
        )
    }

    /// Address of this peer.
    pub fn local_address(&self) -> &NetworkAddress {
        &self.local_address
    }

    /// Configuration in effect.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Register `receiver` under a freshly allocated token.
    ///
    /// Returns the endpoint that senders use to address the receiver.
    pub fn register(&self, receiver: Rc<dyn MessageReceiver>) -> Endpoint {
        let mut data = self.data.borrow_mut();
        data.last_token += 1;
        let token = UID::new(self.incarnation, data.last_token);
        data.endpoints.insert(token, receiver);
        tracing::debug!(peer = %self.local_address, token = %token, "mailbox registered");
        Endpoint::new(self.local_address.clone(), token)
    }

    /// Remove the receiver registered under `token`.
    pub fn unregister(&self, token: &UID) -> Option<Rc<dyn MessageReceiver>> {
        let removed = self.data.borrow_mut().endpoints.remove(token);
        if removed.is_some() {
            tracing::debug!(peer = %self.local_address, token = %token, "mailbox unregistered");
        }
        removed
    }

    /// Send one message to `destination`.
    ///
    /// `writer` fills the payload. The packet is queued on the destination
    /// peer's inbox before this returns; there is no acknowledgment of
    /// delivery and no retry.
    ///
    /// # Errors
    ///
    /// - `NilAddress` if `destination` is nil (the writer is not called)
    /// - `SerializationFailed` if the writer fails
    /// - `Wire` if the payload exceeds the configured limit
    /// - `PeerUnreachable` if no live peer owns the destination address
    /// - `QueueFull` / `TransportClosed` if the destination inbox refuses it
    pub fn send<W>(&self, destination: &Endpoint, writer: W) -> Result<(), MessagingError>
    where
        W: FnOnce(&mut Vec<u8>) -> Result<(), CodecError>,
    {
        if destination.is_nil() {
            return Err(MessagingError::NilAddress);
        }

        let mut payload = Vec::new();
        writer(&mut payload).map_err(|e| MessagingError::SerializationFailed {
            message: e.to_string(),
        })?;

        let sequence = {
            let mut data = self.data.borrow_mut();
            let sequence = data.next_sequence;
            data.next_sequence += 1;
            sequence
        };
        let packet = wire::serialize_packet(
            sequence,
            destination.token,
            &payload,
            self.config.max_payload_size,
        )?;

        if destination.address == self.local_address {
            self.enqueue(packet)?;
        } else {
            let peer = self.network.route(&destination.address).ok_or_else(|| {
                MessagingError::PeerUnreachable {
                    address: destination.address.clone(),
                }
            })?;
            peer.enqueue(packet)?;
        }

        bump(&self.stats.packets_sent);
        tracing::trace!(
            from = %self.local_address,
            to = %destination.address,
            token = %destination.token,
            sequence,
            bytes = payload.len(),
            "packet sent"
        );
        Ok(())
    }

    /// Queue a framed packet for local delivery.
    pub(crate) fn enqueue(&self, packet: Vec<u8>) -> Result<(), MessagingError> {
        {
            let mut data = self.data.borrow_mut();
            if data.closed {
                return Err(MessagingError::TransportClosed);
            }
            if data.inbox.len() >= self.config.inbox_capacity {
                return Err(MessagingError::QueueFull {
                    capacity: self.config.inbox_capacity,
                });
            }
            data.inbox.push_back(packet);
        }
        self.wake.notify_one();
        Ok(())
    }

    /// Deliver the oldest queued packet.
    ///
    /// Returns `None` when the inbox is empty. A panicking receiver unwinds
    /// through this call; the packet is already consumed.
    pub fn deliver_next(&self) -> Option<Result<(), MessagingError>> {
        let packet = self.data.borrow_mut().inbox.pop_front()?;
        Some(self.dispatch(&packet))
    }

    fn dispatch(&self, framed: &[u8]) -> Result<(), MessagingError> {
        let packet = wire::deserialize_packet(framed)?;

        // The borrow must end before the receiver runs: handlers may send.
        let receiver = self.data.borrow().endpoints.get(&packet.token);
        let Some(receiver) = receiver else {
            bump(&self.stats.packets_undelivered);
            tracing::debug!(
                peer = %self.local_address,
                token = %packet.token,
                "packet for unknown mailbox dropped"
            );
            return Err(MessagingError::EndpointNotFound {
                token: packet.token,
            });
        };

        let receipt = Receipt::new(packet.token, Rc::clone(&self.stats));
        match receiver.receive(&packet.payload, receipt) {
            Ok(()) => {
                bump(&self.stats.packets_delivered);
                tracing::trace!(
                    peer = %self.local_address,
                    token = %packet.token,
                    sequence = packet.sequence,
                    "packet delivered"
                );
                Ok(())
            }
            Err(e) => {
                bump(&self.stats.receive_failures);
                Err(e)
            }
        }
    }

    /// Deliver queued packets until the inbox is empty.
    ///
    /// Packets queued by receivers during the pump are delivered too.
    /// Failed deliveries are logged and dropped. Returns the number of
    /// successful deliveries.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        while let Some(result) = self.deliver_next() {
            match result {
                Ok(()) => delivered += 1,
                // Already logged by dispatch.
                Err(MessagingError::EndpointNotFound { .. }) => {}
                Err(e) => {
                    tracing::warn!(peer = %self.local_address, error = %e, "message dropped");
                }
            }
        }
        delivered
    }

    /// Deliver packets as they arrive until the transport is closed.
    ///
    /// Returns once [`close`](Self::close) has been called and the inbox is
    /// drained. The future is `!Send`; drive it on a `LocalSet`.
    pub async fn run(&self) {
        loop {
            self.pump();
            if self.is_closed() {
                break;
            }
            self.wake.notified().await;
        }
        tracing::debug!(peer = %self.local_address, "transport loop exited");
    }

    /// Stop accepting packets and let [`run`](Self::run) return once drained.
    pub fn close(&self) {
        self.data.borrow_mut().closed = true;
        self.wake.notify_one();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.data.borrow().closed
    }

    /// Packets waiting in the inbox.
    pub fn pending(&self) -> usize {
        self.data.borrow().inbox.len()
    }

    /// Number of registered mailboxes.
    pub fn endpoint_count(&self) -> usize {
        self.data.borrow().endpoints.len()
    }

    /// Mailboxes registered over the transport's lifetime.
    pub fn mailboxes_registered(&self) -> u64 {
        self.data.borrow().endpoints.registration_count()
    }

    /// Mailboxes unregistered over the transport's lifetime.
    pub fn mailboxes_unregistered(&self) -> u64 {
        self.data.borrow().endpoints.deregistration_count()
    }

    /// Packets handed off by `send`.
    pub fn packets_sent(&self) -> u64 {
        self.stats.packets_sent.get()
    }

    /// Packets whose receiver returned `Ok`.
    pub fn packets_delivered(&self) -> u64 {
        self.stats.packets_delivered.get()
    }

    /// Packets addressed to a token with no mailbox.
    pub fn packets_undelivered(&self) -> u64 {
        self.stats.packets_undelivered.get()
    }

    /// Receipts acknowledged with [`Receipt::done`].
    pub fn receipts_acknowledged(&self) -> u64 {
        self.stats.receipts_acknowledged.get()
    }

    /// Deliveries whose receiver returned an error.
    pub fn receive_failures(&self) -> u64 {
        self.stats.receive_failures.get()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::RawMailbox;

    fn test_address() -> NetworkAddress {
        NetworkAddress::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4500)
    }

    fn write_bytes(bytes: &'static [u8]) -> impl FnOnce(&mut Vec<u8>) -> Result<(), CodecError> {
        move |out| {
            out.extend_from_slice(bytes);
            Ok(())
        }
    }

    /// Mailbox that records payloads and acknowledges them.
    fn recording_mailbox(transport: &Rc<MailboxTransport>) -> (RawMailbox, Rc<RefCell<Vec<Vec<u8>>>>) {
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        let mailbox = RawMailbox::new(transport, move |payload: &[u8], receipt: Receipt| {
            receipt.done();
            sink.borrow_mut().push(payload.to_vec());
            Ok(())
        });
        (mailbox, received)
    }

    #[test]
    fn test_new_transport() {
        let transport = MailboxTransport::standalone(test_address());

        assert_eq!(transport.endpoint_count(), 0);
        assert_eq!(transport.pending(), 0);
        assert_eq!(transport.packets_sent(), 0);
        assert_eq!(transport.local_address(), &test_address());
    }

    #[test]
    fn test_registered_tokens_are_distinct_and_valid() {
        let transport = MailboxTransport::standalone(test_address());
        let (a, _) = recording_mailbox(&transport);
        let (b, _) = recording_mailbox(&transport);

        assert!(!a.address().is_nil());
        assert!(!b.address().is_nil());
        assert_ne!(a.address().token, b.address().token);
        assert_eq!(a.address().peer(), &test_address());
        assert_eq!(transport.endpoint_count(), 2);
    }

    #[test]
    fn test_registration_history() {
        let transport = MailboxTransport::standalone(test_address());
        let (a, _) = recording_mailbox(&transport);
        let (b, _) = recording_mailbox(&transport);
        let token = a.address().token;

        drop(a);
        // Already removed by the drop.
        assert!(transport.unregister(&token).is_none());

        assert_eq!(transport.mailboxes_registered(), 2);
        assert_eq!(transport.mailboxes_unregistered(), 1);
        assert_eq!(transport.endpoint_count(), 1);

        drop(b);
        assert_eq!(transport.mailboxes_unregistered(), 2);
        assert_eq!(transport.endpoint_count(), 0);
    }

    #[test]
    fn test_local_delivery() {
        let transport = MailboxTransport::standalone(test_address());
        let (mailbox, received) = recording_mailbox(&transport);

        transport
            .send(&mailbox.address(), write_bytes(b"hello local"))
            .expect("send should succeed");

        // Queued, not yet delivered.
        assert_eq!(transport.pending(), 1);
        assert!(received.borrow().is_empty());

        assert_eq!(transport.pump(), 1);
        assert_eq!(*received.borrow(), vec![b"hello local".to_vec()]);
        assert_eq!(transport.packets_sent(), 1);
        assert_eq!(transport.packets_delivered(), 1);
        assert_eq!(transport.receipts_acknowledged(), 1);
    }

    #[test]
    fn test_delivery_preserves_send_order() {
        let transport = MailboxTransport::standalone(test_address());
        let (mailbox, received) = recording_mailbox(&transport);

        let payloads: [&'static [u8]; 3] = [b"one", b"two", b"three"];
        for payload in payloads {
            transport
                .send(&mailbox.address(), write_bytes(payload))
                .expect("send should succeed");
        }
        transport.pump();

        assert_eq!(
            *received.borrow(),
            vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
    }

    #[test]
    fn test_nil_destination_rejected_before_writing() {
        let transport = MailboxTransport::standalone(test_address());
        let wrote = Cell::new(false);

        let result = transport.send(&Endpoint::nil(), |_out| {
            wrote.set(true);
            Ok(())
        });

        assert!(matches!(result, Err(MessagingError::NilAddress)));
        assert!(!wrote.get());
        assert_eq!(transport.packets_sent(), 0);
    }

    #[test]
    fn test_writer_failure_is_serialization_error() {
        let transport = MailboxTransport::standalone(test_address());
        let (mailbox, _) = recording_mailbox(&transport);

        let result = transport.send(&mailbox.address(), |_out| {
            Err(CodecError::Encode(Box::new(std::io::Error::other("boom"))))
        });

        assert!(matches!(
            result,
            Err(MessagingError::SerializationFailed { .. })
        ));
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn test_unknown_peer_is_unreachable() {
        let transport = MailboxTransport::standalone(test_address());
        let remote = NetworkAddress::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)), 4500);

        let result = transport.send(&Endpoint::new(remote, UID::new(1, 1)), write_bytes(b"x"));
        assert!(matches!(
            result,
            Err(MessagingError::PeerUnreachable { .. })
        ));
    }

    #[test]
    fn test_payload_limit_enforced() {
        let transport = MailboxTransport::new(
            test_address(),
            &LoopbackNetwork::new(),
            TransportConfig::default().with_max_payload_size(4),
        );
        let (mailbox, _) = recording_mailbox(&transport);

        let result = transport.send(&mailbox.address(), write_bytes(b"too long"));
        assert!(matches!(result, Err(MessagingError::Wire(_))));
    }

    #[test]
    fn test_queue_full() {
        let transport = MailboxTransport::new(
            test_address(),
            &LoopbackNetwork::new(),
            TransportConfig::default().with_inbox_capacity(2),
        );
        let (mailbox, _) = recording_mailbox(&transport);

        for _ in 0..2 {
            transport
                .send(&mailbox.address(), write_bytes(b"x"))
                .expect("send should succeed");
        }
        let result = transport.send(&mailbox.address(), write_bytes(b"x"));
        assert!(matches!(
            result,
            Err(MessagingError::QueueFull { capacity: 2 })
        ));

        assert_eq!(transport.pump(), 2);
        transport
            .send(&mailbox.address(), write_bytes(b"x"))
            .expect("send should succeed once drained");
    }

    #[test]
    fn test_dropped_mailbox_is_undeliverable() {
        let transport = MailboxTransport::standalone(test_address());
        let (mailbox, received) = recording_mailbox(&transport);
        let address = mailbox.address();

        drop(mailbox);
        assert_eq!(transport.endpoint_count(), 0);

        // Sending still succeeds: delivery is fire-and-forget.
        transport
            .send(&address, write_bytes(b"late"))
            .expect("send should succeed");

        let result = transport.deliver_next().expect("one packet queued");
        assert!(matches!(
            result,
            Err(MessagingError::EndpointNotFound { .. })
        ));
        assert_eq!(transport.packets_undelivered(), 1);
        assert!(received.borrow().is_empty());
    }

    #[test]
    fn test_receiver_failure_counted() {
        let transport = MailboxTransport::standalone(test_address());
        let mailbox = RawMailbox::new(&transport, |_payload: &[u8], _receipt: Receipt| {
            Err(MessagingError::DeserializationFailed {
                message: "bad".to_string(),
            })
        });

        transport
            .send(&mailbox.address(), write_bytes(b"x"))
            .expect("send should succeed");

        assert_eq!(transport.pump(), 0);
        assert_eq!(transport.receive_failures(), 1);
        assert_eq!(transport.receipts_acknowledged(), 0);
        assert_eq!(transport.packets_delivered(), 0);
    }

    #[test]
    fn test_receiver_can_send_during_pump() {
        let transport = MailboxTransport::standalone(test_address());
        let hops = Rc::new(Cell::new(0u32));

        // The mailbox forwards to itself until it has seen three messages.
        let self_address: Rc<RefCell<Option<Endpoint>>> = Rc::new(RefCell::new(None));
        let weak = Rc::downgrade(&transport);
        let mailbox = {
            let hops = Rc::clone(&hops);
            let self_address = Rc::clone(&self_address);
            RawMailbox::new(&transport, move |_payload: &[u8], receipt: Receipt| {
                receipt.done();
                hops.set(hops.get() + 1);
                if hops.get() >= 3 {
                    return Ok(());
                }
                let address = self_address.borrow().clone();
                if let (Some(transport), Some(address)) = (weak.upgrade(), address) {
                    transport.send(&address, |_out| Ok(()))?;
                }
                Ok(())
            })
        };
        *self_address.borrow_mut() = Some(mailbox.address());

        transport
            .send(&mailbox.address(), write_bytes(b""))
            .expect("send should succeed");

        assert_eq!(transport.pump(), 3);
        assert_eq!(hops.get(), 3);
        assert_eq!(transport.pending(), 0);
    }

    #[test]
    fn test_closed_transport_rejects_packets() {
        let transport = MailboxTransport::standalone(test_address());
        let (mailbox, _) = recording_mailbox(&transport);

        transport.close();
        assert!(transport.is_closed());

        let result = transport.send(&mailbox.address(), write_bytes(b"x"));
        assert!(matches!(result, Err(MessagingError::TransportClosed)));
    }
}
