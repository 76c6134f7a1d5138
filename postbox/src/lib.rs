//! # postbox
//!
//! Typed one-way mailboxes.
//!
//! A [`TypedMailbox`] binds a handler taking up to [`MAX_ARITY`] arguments to
//! an endpoint on a [`MailboxTransport`]. Its [`MailboxAddress`] is a plain
//! serializable value: hand it to any peer, and that peer can send the
//! handler's exact argument list to it. Sending is fire-and-forget; the
//! receiver acknowledges each delivery before its handler runs.
//!
//! ```
//! use std::cell::RefCell;
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::rc::Rc;
//!
//! use postbox::{MailboxTransport, NetworkAddress, TypedMailbox};
//!
//! let transport = MailboxTransport::standalone(NetworkAddress::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4500));
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = Rc::clone(&seen);
//! let mailbox = TypedMailbox::<(u64, String)>::new(&transport, move |id, name| {
//!     sink.borrow_mut().push(format!("{id}:{name}"));
//! });
//!
//! mailbox
//!     .address()
//!     .send(&transport, &7, &"seven".to_string())
//!     .expect("send");
//! transport.pump();
//!
//! assert_eq!(*seen.borrow(), vec!["7:seven".to_string()]);
//! ```
//!
//! Crate layout:
//!
//! - [`postbox_core`]: addressing types and the per-argument codec
//! - [`postbox_transport`]: untyped mailboxes and the peer transport
//! - [`typed`]: the typed family, with per-arity glue emitted at build time
//!   by `postbox-codegen`

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod typed;

pub use postbox_core::{
    ArgReader, ArgWriter, CodecError, Endpoint, JsonCodec, MessageCodec, NetworkAddress, UID,
};
pub use postbox_transport::{
    LoopbackNetwork, MailboxTransport, MessagingError, RawMailbox, Receipt, TransportConfig,
};

pub use typed::{MAX_ARITY, MailboxAddress, MailboxArg, MailboxArgs, TypedMailbox, send};
