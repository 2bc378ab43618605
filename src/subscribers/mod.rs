//! # Event subscribers for the modvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`] for handling events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Reconciler ── publish(Event) ──► Bus ──► subscriber_listener ──► SubscriberSet
//!                                                                        │
//!                                                          ┌─────────────┼──────────┐
//!                                                          ▼             ▼          ▼
//!                                                      LogWriter      Metrics    Custom
//! ```
//!
//! Implement [`Subscribe`] to plug custom handlers (metrics, alerts, audit).

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
