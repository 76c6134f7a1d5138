//! In-process network joining several transports.
//!
//! Each transport attaches under its local address. Sends to a non-local
//! address are routed to the attached transport's inbox. The network only
//! holds weak references, so dropping a transport takes it off the network.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::NetworkAddress;
use crate::transport::MailboxTransport;

/// Routing table from peer address to transport.
///
/// Cloning yields another handle to the same network.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    peers: Rc<RefCell<HashMap<NetworkAddress, Weak<MailboxTransport>>>>,
}

impl LoopbackNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `transport` under its local address.
    ///
    /// A transport already attached at that address is replaced.
    pub fn attach(&self, transport: &Rc<MailboxTransport>) {
        let address = transport.local_address().clone();
        let previous = self
            .peers
            .borrow_mut()
            .insert(address.clone(), Rc::downgrade(transport));
        if previous.is_some_and(|p| p.strong_count() > 0) {
            tracing::warn!(peer = %address, "peer address reused, previous transport detached");
        } else {
            tracing::debug!(peer = %address, "peer attached");
        }
    }

    /// Remove the transport attached at `address`.
    pub fn detach(&self, address: &NetworkAddress) -> bool {
        let removed = self.peers.borrow_mut().remove(address).is_some();
        if removed {
            tracing::debug!(peer = %address, "peer detached");
        }
        removed
    }

    /// Find the live transport attached at `address`.
    ///
    /// Entries whose transport was dropped are pruned.
    pub fn route(&self, address: &NetworkAddress) -> Option<Rc<MailboxTransport>> {
        let mut peers = self.peers.borrow_mut();
        let transport = peers.get(address)?.upgrade();
        if transport.is_none() {
            peers.remove(address);
            tracing::debug!(peer = %address, "dropped peer pruned");
        }
        transport
    }

    /// Number of attached transports still alive.
    pub fn peer_count(&self) -> usize {
        self.peers
            .borrow()
            .values()
            .filter(|p| p.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;
    use crate::TransportConfig;

    fn address(port: u16) -> NetworkAddress {
        NetworkAddress::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    #[test]
    fn test_attach_and_route() {
        let network = LoopbackNetwork::new();
        let a = MailboxTransport::new(address(1), &network, TransportConfig::default());
        let _b = MailboxTransport::new(address(2), &network, TransportConfig::default());

        assert_eq!(network.peer_count(), 2);
        let routed = network.route(&address(1)).expect("peer should be routable");
        assert!(Rc::ptr_eq(&routed, &a));
        assert!(network.route(&address(3)).is_none());
    }

    #[test]
    fn test_dropped_transport_is_pruned() {
        let network = LoopbackNetwork::new();
        let a = MailboxTransport::new(address(1), &network, TransportConfig::default());

        drop(a);
        assert_eq!(network.peer_count(), 0);
        assert!(network.route(&address(1)).is_none());
        // Pruned by the failed route.
        assert!(!network.detach(&address(1)));
    }

    #[test]
    fn test_detach() {
        let network = LoopbackNetwork::new();
        let _a = MailboxTransport::new(address(1), &network, TransportConfig::default());

        assert!(network.detach(&address(1)));
        assert!(network.route(&address(1)).is_none());
        assert!(!network.detach(&address(1)));
    }
}
