//! EndpointMap: token → receiver routing.

use std::collections::HashMap;
use std::rc::Rc;

use crate::UID;

use super::MessageReceiver;

/// Maps mailbox tokens to the receivers registered for them.
pub struct EndpointMap {
    receivers: HashMap<UID, Rc<dyn MessageReceiver>>,

    /// Counters for metrics and debugging.
    registration_count: u64,
    deregistration_count: u64,
}

impl Default for EndpointMap {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointMap {
    /// Create a new empty endpoint map.
    pub fn new() -> Self {
        Self {
            receivers: HashMap::new(),
            registration_count: 0,
            deregistration_count: 0,
        }
    }

    /// Register `receiver` under `token`, replacing any previous receiver.
    pub fn insert(&mut self, token: UID, receiver: Rc<dyn MessageReceiver>) {
        debug_assert!(token.is_valid(), "nil token cannot name a mailbox");
        self.receivers.insert(token, receiver);
        self.registration_count += 1;
    }

    /// Look up the receiver for `token`.
    ///
    /// The receiver is cloned out so callers can drop their borrow of the
    /// map before delivering.
    pub fn get(&self, token: &UID) -> Option<Rc<dyn MessageReceiver>> {
        self.receivers.get(token).cloned()
    }

    /// Remove the receiver for `token`.
    pub fn remove(&mut self, token: &UID) -> Option<Rc<dyn MessageReceiver>> {
        let removed = self.receivers.remove(token);
        if removed.is_some() {
            self.deregistration_count += 1;
        }
        removed
    }

    /// Number of registered receivers.
    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    /// Whether no receiver is registered.
    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    /// Total registrations over the map's lifetime.
    pub fn registration_count(&self) -> u64 {
        self.registration_count
    }

    /// Total successful removals over the map's lifetime.
    pub fn deregistration_count(&self) -> u64 {
        self.deregistration_count
    }
}
