//=========================================================================
// Scene Events
//=========================================================================
//
// Notifications published by the scene lifecycle to outside listeners
// (view layer, HUD, loading screens).
//
// Architecture:
//   SceneManager / LoadingPipeline ──publish()──> one bounded queue
//                                                 per subscriber
//                                                     ↓
//   listeners ←────────── subscribe() (fresh crossbeam receiver)
//
// Publishing never blocks the lifecycle: when a subscriber's queue is full
// the event is dropped for that subscriber with a warning. With nobody
// subscribed, events go nowhere.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::rc::Rc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::warn;

//=== SceneEvent ==========================================================

/// Lifecycle notifications for collaborators outside the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    /// A transition towards `to` was accepted.
    TransitionStarted { from: Option<String>, to: String },

    /// The named scene is tearing down its repositories and interactors.
    TearingDown(String),

    /// A load unit of the incoming scene finished.
    UnitLoaded {
        scene: String,
        unit: String,
        loaded: usize,
        total: usize,
    },

    /// The named scene is active and its services are initialized.
    Ready(String),

    /// The transition towards `scene` failed and was abandoned.
    TransitionFailed { scene: String, reason: String },
}

//=== EventChannel ========================================================

/// Publish side of the scene event stream.
///
/// Every subscriber owns a bounded queue of its own, so each one sees every
/// event published after it subscribed. Clones share the subscriber list.
#[derive(Debug, Clone)]
pub struct EventChannel {
    capacity: usize,
    subscribers: Rc<RefCell<Vec<Sender<SceneEvent>>>>,
}

impl EventChannel {
    /// Creates a channel whose subscribers buffer up to `capacity`
    /// undelivered events each.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            subscribers: Rc::default(),
        }
    }

    /// Publishes an event to every live subscriber without blocking.
    ///
    /// Subscribers whose receiver was dropped are forgotten.
    pub fn publish(&self, event: SceneEvent) {
        self.subscribers
            .borrow_mut()
            .retain(|sender| match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(event)) => {
                    warn!("Scene event subscriber full, dropping {:?}", event);
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    /// Returns a receiver for events published from now on.
    pub fn subscribe(&self) -> Receiver<SceneEvent> {
        let (sender, receiver) = bounded(self.capacity);
        self.subscribers.borrow_mut().push(sender);
        receiver
    }

    /// Subscribers still attached after the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

//=========================================================================
// Tests
//=========================================================================
