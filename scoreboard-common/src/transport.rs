//! The boundary between the synchronization core and whatever carries frames between
//! processes.
//!
//! The publishing end only needs to push frames out. The subscribing end delivers inbound
//! frames and connection status changes to registered callbacks. Neither end resends
//! history: after a reconnect the next frame the publisher sends is what brings a display up
//! to date.

use log::*;
use std::{cell::RefCell, collections::BTreeMap, rc::Rc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Frame(String),
}

pub type EventCallback = Box<dyn FnMut(&TransportEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("The transport has been shut down")]
    Closed,
}

pub trait PublishChannel {
    fn publish(&mut self, frame: &str) -> Result<(), TransportError>;
}

pub trait SubscribeChannel {
    fn subscribe(&mut self, callback: EventCallback) -> SubscriptionId;

    /// Returns false if there was no such subscription
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}

/// The callbacks registered on one subscribing endpoint
#[derive(Default)]
pub struct Subscriptions {
    next_id: u64,
    callbacks: BTreeMap<SubscriptionId, EventCallback>,
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions")
            .field("next_id", &self.next_id)
            .field("ids", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Subscriptions {
    pub fn add(&mut self, callback: EventCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.insert(id, callback);
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        self.callbacks.remove(&id).is_some()
    }

    /// Calls every callback, in the order they were registered
    pub fn dispatch(&mut self, event: &TransportEvent) {
        for callback in self.callbacks.values_mut() {
            callback(event);
        }
    }
}

#[derive(Debug, Default)]
struct EndpointState {
    connected: bool,
    subscriptions: Subscriptions,
}

#[derive(Debug, Default)]
struct Hub {
    next_id: usize,
    endpoints: BTreeMap<usize, Rc<RefCell<EndpointState>>>,
}

/// An in-process channel: ordered and reliable while an endpoint is connected, lossy across a
/// disconnect. Callbacks run synchronously inside `publish` and must not call back into the
/// channel.
#[derive(Debug, Clone, Default)]
pub struct LocalChannel {
    hub: Rc<RefCell<Hub>>,
}

impl LocalChannel {
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a new subscribing endpoint. It starts out disconnected.
    pub fn endpoint(&self) -> LocalEndpoint {
        let mut hub = self.hub.borrow_mut();
        let id = hub.next_id;
        hub.next_id += 1;
        let state = Rc::new(RefCell::new(EndpointState::default()));
        hub.endpoints.insert(id, state.clone());
        LocalEndpoint {
            id,
            state,
            hub: self.hub.clone(),
        }
    }

    fn connected_endpoints(&self) -> Vec<Rc<RefCell<EndpointState>>> {
        self.hub
            .borrow()
            .endpoints
            .values()
            .filter(|state| state.borrow().connected)
            .cloned()
            .collect()
    }
}

impl PublishChannel for LocalChannel {
    fn publish(&mut self, frame: &str) -> Result<(), TransportError> {
        let endpoints = self.connected_endpoints();
        trace!("Publishing frame to {} local endpoints", endpoints.len());
        let event = TransportEvent::Frame(frame.to_string());
        for state in endpoints {
            state.borrow_mut().subscriptions.dispatch(&event);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct LocalEndpoint {
    id: usize,
    state: Rc<RefCell<EndpointState>>,
    hub: Rc<RefCell<Hub>>,
}

impl LocalEndpoint {
    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn connect(&mut self) {
        self.set_connected(true);
    }

    pub fn disconnect(&mut self) {
        self.set_connected(false);
    }

    fn set_connected(&mut self, connected: bool) {
        let mut state = self.state.borrow_mut();
        if state.connected == connected {
            return;
        }
        state.connected = connected;
        debug!(
            "Local endpoint {} {}",
            self.id,
            if connected { "connected" } else { "disconnected" }
        );
        let event = if connected {
            TransportEvent::Connected
        } else {
            TransportEvent::Disconnected
        };
        state.subscriptions.dispatch(&event);
    }
}

impl SubscribeChannel for LocalEndpoint {
    fn subscribe(&mut self, callback: EventCallback) -> SubscriptionId {
        self.state.borrow_mut().subscriptions.add(callback)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.state.borrow_mut().subscriptions.remove(id)
    }
}

impl Drop for LocalEndpoint {
    fn drop(&mut self) {
        self.hub.borrow_mut().endpoints.remove(&self.id);
    }
}
