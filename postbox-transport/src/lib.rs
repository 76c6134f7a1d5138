//! # postbox-transport
//!
//! Untyped mailboxes and the peer transport that carries their messages.
//!
//! A [`MailboxTransport`] is one peer's link: it hands out mailbox tokens,
//! frames outgoing payloads and delivers incoming ones to the registered
//! [`MessageReceiver`]. Sending never blocks and never waits for the
//! receiver. Delivery happens when the owner drains the inbox with
//! [`MailboxTransport::pump`] or drives [`MailboxTransport::run`] on a
//! `LocalSet`.
//!
//! Several transports share a [`LoopbackNetwork`] to reach each other's
//! mailboxes by address.
//!
//! ```
//! use std::net::{IpAddr, Ipv4Addr};
//! use postbox_transport::{MailboxTransport, NetworkAddress, RawMailbox, Receipt};
//!
//! let transport = MailboxTransport::standalone(NetworkAddress::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4500));
//! let mailbox = RawMailbox::new(&transport, |payload: &[u8], receipt: Receipt| {
//!     receipt.done();
//!     assert_eq!(payload, b"ping");
//!     Ok(())
//! });
//!
//! transport
//!     .send(&mailbox.address(), |out| {
//!         out.extend_from_slice(b"ping");
//!         Ok(())
//!     })
//!     .expect("send");
//! assert_eq!(transport.pump(), 1);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod wire;

mod config;
mod mailbox;
mod network;
mod transport;

pub use postbox_core::{
    ArgReader, ArgWriter, CodecError, Endpoint, JsonCodec, LENGTH_PREFIX_SIZE, MessageCodec,
    NetworkAddress, NetworkAddressParseError, UID,
};

pub use config::TransportConfig;
pub use error::MessagingError;
pub use mailbox::{EndpointMap, MessageReceiver, RawMailbox, Receipt};
pub use network::LoopbackNetwork;
pub use transport::MailboxTransport;
