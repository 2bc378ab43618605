//! # Main-thread work dispatch.
//!
//! Lets any component run a closure on the launcher's designated thread.
//!
//! ```text
//! producer ── DispatchHandle::execute(work) ──► [ mpsc, capacity 1 ] ──► MainThreadDispatcher::run
//!                 │ slot taken → Err(Full) + WorkRejected                       │
//!                 └ loop gone  → Err(Closed)                                     └─ stops on host "stopping"
//! ```
//!
//! Submission never blocks: the single slot is the whole backpressure contract.

mod error;
mod executor;

pub use error::DispatchError;
pub use executor::{DispatchHandle, MainThreadDispatcher, Work};
