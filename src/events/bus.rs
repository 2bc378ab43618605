//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets the
//! reconciler (thread A), the dispatcher (thread B) and the launcher publish
//! events without blocking and without sharing any other state.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Subscriber (one):
//!   Reconciler  ──┐
//!   CycleDriver ──┼──────► Bus ───────► subscriber_listener ────► SubscriberSet
//!   Dispatcher  ──┤  (broadcast chan)     (in Launcher)
//!   Launcher    ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and works from any
//!   thread, inside or outside a tokio runtime.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active subscribers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn receivers_only_see_later_events() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::ModulesResolved));
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ModuleInstalled));
        assert_eq!(rx.try_recv().map(|e| e.kind).ok(), Some(EventKind::ModuleInstalled));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = Bus::new(0);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::HostStopped));
        assert!(rx.try_recv().is_ok());
    }
}
