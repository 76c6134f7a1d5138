//! The typed mailbox family.
//!
//! [`TypedMailbox<Args>`] is generic over a tuple of argument types. The
//! argument list is fixed when the mailbox is declared: the handler takes
//! exactly those arguments, in that order, and [`MailboxAddress<Args>::send`]
//! takes the same list. Both are emitted per arity (0 through [`MAX_ARITY`])
//! by `postbox-codegen`; everything below is shared by all arities.
//!
//! Anything that is not one of the generated tuples is rejected when the
//! mailbox type is named:
//!
//! ```compile_fail
//! use postbox::TypedMailbox;
//!
//! // A bare type is not an argument list.
//! fn bind(_mailbox: Option<TypedMailbox<String>>) {}
//! ```
//!
//! [`MailboxAddress<Args>::send`]: MailboxAddress

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    ArgReader, ArgWriter, CodecError, Endpoint, MailboxTransport, MessagingError, NetworkAddress,
    RawMailbox, Receipt,
};

/// A value that can travel as one mailbox argument.
///
/// Implemented for every `Serialize + DeserializeOwned` type.
pub trait MailboxArg: Serialize + DeserializeOwned + 'static {}

impl<T> MailboxArg for T where T: Serialize + DeserializeOwned + 'static {}

mod sealed {
    /// Closes [`MailboxArgs`](super::MailboxArgs) to the generated tuples.
    pub trait Sealed {}
}

mod generated {
    include!(concat!(env!("OUT_DIR"), "/typed_mailbox.rs"));
}

pub use generated::{MAX_ARITY, MailboxArgs};

/// Address of a [`TypedMailbox<Args>`].
///
/// A plain value wrapping the mailbox's raw [`Endpoint`]. It can be cloned,
/// serialized and passed to peers that never saw the mailbox, including as
/// an argument of another mailbox. It may outlive the mailbox; sends to a
/// dropped mailbox are counted as undelivered by the receiving transport.
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct MailboxAddress<Args> {
    raw: Endpoint,
    #[serde(skip)]
    _args: PhantomData<fn() -> Args>,
}

impl<Args> MailboxAddress<Args> {
    fn from_raw(raw: Endpoint) -> Self {
        Self {
            raw,
            _args: PhantomData,
        }
    }

    /// An address that names no mailbox.
    pub fn nil() -> Self {
        Self::from_raw(Endpoint::nil())
    }

    /// Whether this address names no mailbox.
    pub fn is_nil(&self) -> bool {
        self.raw.is_nil()
    }

    /// Peer owning the mailbox.
    pub fn peer(&self) -> &NetworkAddress {
        self.raw.peer()
    }

    /// The untyped endpoint this address wraps.
    pub fn raw(&self) -> &Endpoint {
        &self.raw
    }
}

impl<Args> Default for MailboxAddress<Args> {
    fn default() -> Self {
        Self::nil()
    }
}

impl<Args> Clone for MailboxAddress<Args> {
    fn clone(&self) -> Self {
        Self::from_raw(self.raw.clone())
    }
}

impl<Args> PartialEq for MailboxAddress<Args> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<Args> Eq for MailboxAddress<Args> {}

impl<Args> Hash for MailboxAddress<Args> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<Args> fmt::Debug for MailboxAddress<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxAddress")
            .field("peer", &self.raw.address)
            .field("token", &self.raw.token)
            .finish()
    }
}

/// A mailbox whose handler takes the arguments `Args`.
///
/// Created with the generated `TypedMailbox::<(A0, ..)>::new`. The handler
/// stays registered on the transport until the mailbox is dropped.
pub struct TypedMailbox<Args: MailboxArgs> {
    mailbox: RawMailbox,
    _args: PhantomData<fn(Args)>,
}

impl<Args: MailboxArgs> TypedMailbox<Args> {
    /// Register `handler` on `transport` behind the typed receive path.
    ///
    /// Each payload is decoded into exactly `Args`, with no bytes left over,
    /// and acknowledged before the handler runs. A payload that does not
    /// decode is dropped unacknowledged.
    fn bind<F>(transport: &Rc<MailboxTransport>, handler: F) -> Self
    where
        F: Fn(Args) + 'static,
    {
        let mailbox = RawMailbox::new(transport, move |payload: &[u8], receipt: Receipt| {
            let args = decode_args::<Args>(payload).map_err(|e| {
                tracing::debug!(
                    token = %receipt.token(),
                    arity = Args::ARITY,
                    error = %e,
                    "typed mailbox rejected payload"
                );
                MessagingError::DeserializationFailed {
                    message: e.to_string(),
                }
            })?;
            receipt.done();
            handler(args);
            Ok(())
        });
        Self {
            mailbox,
            _args: PhantomData,
        }
    }

    /// Address of this mailbox.
    pub fn address(&self) -> MailboxAddress<Args> {
        MailboxAddress::from_raw(self.mailbox.address())
    }

    /// Transport the mailbox is registered on.
    pub fn transport(&self) -> &Rc<MailboxTransport> {
        self.mailbox.transport()
    }
}

impl<Args: MailboxArgs> fmt::Debug for TypedMailbox<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedMailbox")
            .field("arity", &Args::ARITY)
            .field("address", &self.mailbox.address())
            .finish()
    }
}

fn decode_args<Args: MailboxArgs>(payload: &[u8]) -> Result<Args, CodecError> {
    let mut input = ArgReader::new(payload);
    let args = Args::read_args(&mut input)?;
    input.finish()?;
    Ok(args)
}

/// Send a whole argument tuple to `address`.
///
/// Equivalent to the per-arity `MailboxAddress::send`, for callers that
/// already hold the arguments as a tuple.
///
/// # Errors
///
/// Fails if the address is nil, an argument cannot be encoded, or the
/// transport cannot queue the message.
pub fn send<Args: MailboxArgs>(
    transport: &MailboxTransport,
    address: &MailboxAddress<Args>,
    args: &Args,
) -> Result<(), MessagingError> {
    transport.send(&address.raw, |out| args.write_args(&mut ArgWriter::new(out)))
}
