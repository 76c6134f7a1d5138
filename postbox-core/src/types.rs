//! Addressing types shared by the transport and the typed mailbox layer.
//!
//! - [`UID`]: 128-bit token naming one mailbox inside a peer
//! - [`NetworkAddress`]: identity of a peer (IP address + port)
//! - [`Endpoint`]: the raw mailbox address, peer + token

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// 128-bit mailbox token.
///
/// The all-zero token is reserved: an [`Endpoint`] carrying it is nil.
///
/// # Examples
///
/// ```
/// use postbox_core::UID;
///
/// assert!(UID::new(0x1, 0x2).is_valid());
/// assert!(!UID::NIL.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UID {
    /// High 64 bits. Transports put their incarnation here.
    pub first: u64,
    /// Low 64 bits. Transports put a per-incarnation counter here.
    pub second: u64,
}

impl UID {
    /// The reserved nil token.
    pub const NIL: UID = UID::new(0, 0);

    /// Create a token from its two halves.
    pub const fn new(first: u64, second: u64) -> Self {
        Self { first, second }
    }

    /// Whether this token can name a mailbox (i.e. is not [`UID::NIL`]).
    pub const fn is_valid(&self) -> bool {
        self.first != 0 || self.second != 0
    }
}

impl std::fmt::Display for UID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}{:016x}", self.first, self.second)
    }
}

/// Peer identity: the address other peers use to reach it.
///
/// # Examples
///
/// ```
/// use postbox_core::NetworkAddress;
/// use std::net::{IpAddr, Ipv4Addr};
///
/// let addr = NetworkAddress::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4500);
/// assert_eq!(addr.to_string(), "127.0.0.1:4500");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkAddress {
    /// IP address (IPv4 or IPv6).
    pub ip: IpAddr,
    /// Port number.
    pub port: u16,
}

impl NetworkAddress {
    /// Create a new network address.
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// The unspecified address `0.0.0.0:0`, owner of every nil endpoint.
    pub fn unspecified() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
    }

    /// Parse from `ip:port`, or `[ipv6]:port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the IP or the port cannot be parsed.
    pub fn parse(s: &str) -> Result<Self, NetworkAddressParseError> {
        let (ip_str, port_str) = match s.strip_prefix('[') {
            Some(rest) => {
                let (ip, tail) = rest
                    .split_once(']')
                    .ok_or(NetworkAddressParseError::InvalidIp)?;
                let port = tail
                    .strip_prefix(':')
                    .ok_or(NetworkAddressParseError::MissingPort)?;
                (ip, port)
            }
            None => s
                .rsplit_once(':')
                .ok_or(NetworkAddressParseError::MissingPort)?,
        };

        let ip: IpAddr = ip_str
            .parse()
            .map_err(|_| NetworkAddressParseError::InvalidIp)?;
        let port: u16 = port_str
            .parse()
            .map_err(|_| NetworkAddressParseError::InvalidPort)?;
        Ok(Self::new(ip, port))
    }
}

impl std::fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ip {
            IpAddr::V4(ip) => write!(f, "{}:{}", ip, self.port),
            IpAddr::V6(ip) => write!(f, "[{}]:{}", ip, self.port),
        }
    }
}

/// Error parsing a network address from string.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkAddressParseError {
    /// The IP address could not be parsed.
    #[error("invalid IP address")]
    InvalidIp,
    /// The port number could not be parsed.
    #[error("invalid port number")]
    InvalidPort,
    /// No port separator (`:`) found in the input.
    #[error("missing port separator")]
    MissingPort,
}

/// Raw mailbox address: owning peer + local token.
///
/// This is what the transport routes on. It is a plain value with no
/// reference to the mailbox it names, so it can be copied to other peers
/// and outlive the mailbox.
///
/// # Examples
///
/// ```
/// use postbox_core::{Endpoint, NetworkAddress, UID};
///
/// let peer = NetworkAddress::parse("10.0.0.1:4500").expect("parse");
/// let endpoint = Endpoint::new(peer.clone(), UID::new(7, 1));
///
/// assert!(!endpoint.is_nil());
/// assert_eq!(endpoint.peer(), &peer);
/// assert!(Endpoint::nil().is_nil());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Peer that owns the mailbox.
    pub address: NetworkAddress,
    /// Token of the mailbox inside that peer.
    pub token: UID,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(address: NetworkAddress, token: UID) -> Self {
        Self { address, token }
    }

    /// The nil endpoint. It names no mailbox.
    pub fn nil() -> Self {
        Self::new(NetworkAddress::unspecified(), UID::NIL)
    }

    /// Whether this endpoint is nil.
    pub fn is_nil(&self) -> bool {
        !self.token.is_valid()
    }

    /// The peer owning this endpoint.
    pub fn peer(&self) -> &NetworkAddress {
        &self.address
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::nil()
    }
}
