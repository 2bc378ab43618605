//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the reconciler, the cycle driver,
//! the main-thread dispatcher and the launcher.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Reconciler`, `CycleDriver`, `MainThreadDispatcher`,
//!   `DispatchHandle`, `Launcher`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Launcher::subscriber_listener()` (fans out to `SubscriberSet`).

mod bus;
mod event;

pub use bus::Bus;
pub(crate) use event::panic_message;
pub use event::{Event, EventKind};
