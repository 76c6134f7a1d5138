//! # postbox-core
//!
//! Core types for postbox mailboxes.
//!
//! - **Addressing**: [`UID`], [`NetworkAddress`] and [`Endpoint`], the raw
//!   address every mailbox is reachable at
//! - **Codec**: [`MessageCodec`] with the default [`JsonCodec`], plus the
//!   ordered per-argument archive ([`ArgWriter`] / [`ArgReader`]) that
//!   typed mailboxes encode their messages with

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod codec;
mod types;

pub use codec::{ArgReader, ArgWriter, CodecError, JsonCodec, LENGTH_PREFIX_SIZE, MessageCodec};
pub use types::{Endpoint, NetworkAddress, NetworkAddressParseError, UID};
