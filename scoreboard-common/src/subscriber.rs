use crate::{
    game_state::GameState,
    protocol,
    transport::{SubscribeChannel, SubscriptionId, TransportEvent},
};
use log::*;
use std::{cell::RefCell, rc::Rc};

pub type SnapshotCallback = Box<dyn FnMut(&GameState)>;

/// What a renderer should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View<'a> {
    /// No snapshot has arrived since this display started
    Waiting,
    /// The operator has hidden the scoreboard
    Hidden,
    Visible(&'a GameState),
}

/// A passive mirror of the publisher's game state. It never edits the state it holds, it only
/// replaces it wholesale when a valid snapshot arrives.
#[derive(Default)]
pub struct Subscriber {
    latest: Option<GameState>,
    connected: bool,
    fresh_since_connect: bool,
    dropped_frames: u64,
    callbacks: Vec<SnapshotCallback>,
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("latest", &self.latest)
            .field("connected", &self.connected)
            .field("fresh_since_connect", &self.fresh_since_connect)
            .field("dropped_frames", &self.dropped_frames)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl Subscriber {
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a subscriber fed by `channel`
    pub fn attach<C: SubscribeChannel>(channel: &mut C) -> (Rc<RefCell<Self>>, SubscriptionId) {
        let subscriber = Rc::new(RefCell::new(Self::new()));
        let feed = subscriber.clone();
        let id = channel.subscribe(Box::new(move |event: &TransportEvent| {
            feed.borrow_mut().handle_event(event)
        }));
        (subscriber, id)
    }

    pub fn on_snapshot(&mut self, callback: SnapshotCallback) {
        self.callbacks.push(callback);
    }

    pub fn latest(&self) -> Option<&GameState> {
        self.latest.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True if the snapshot held was received before the most recent (re)connect, or if the
    /// transport is currently down
    pub fn is_stale(&self) -> bool {
        self.latest.is_some() && !(self.connected && self.fresh_since_connect)
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn view(&self) -> View<'_> {
        match &self.latest {
            None => View::Waiting,
            Some(state) if !state.show_scoreboard => View::Hidden,
            Some(state) => View::Visible(state),
        }
    }

    pub fn handle_event(&mut self, event: &TransportEvent) {
        match event {
            TransportEvent::Connected => {
                info!("Connected to the control surface");
                self.connected = true;
                self.fresh_since_connect = false;
            }
            TransportEvent::Disconnected => {
                warn!("Lost connection to the control surface, keeping the last snapshot");
                self.connected = false;
            }
            TransportEvent::Frame(frame) => {
                self.handle_frame(frame);
            }
        }
    }

    /// Returns true if the frame was accepted. A rejected frame leaves the held snapshot as
    /// it was.
    pub fn handle_frame(&mut self, frame: &str) -> bool {
        match protocol::decode(frame) {
            Ok(state) => {
                trace!("Received snapshot: {state:?}");
                for callback in self.callbacks.iter_mut() {
                    callback(&state);
                }
                self.latest = Some(state);
                self.fresh_since_connect = true;
                true
            }
            Err(e) => {
                self.dropped_frames += 1;
                warn!("Corrupted snapshot discarded: {e}");
                false
            }
        }
    }
}
