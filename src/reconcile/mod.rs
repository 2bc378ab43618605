//! # Reconciliation engine.
//!
//! [`Reconciler::synchronize`] performs one convergence cycle: it drives the
//! host's live module set toward the [`Declaration`](crate::Declaration) and
//! returns every failed operation as data.
//!
//! ## Cycle
//! ```text
//! synchronize()
//!   ├─ 1. change detection   declaration mtime > last loaded?  (strictly newer)
//!   ├─ 2. reload             only when changed
//!   ├─ 3. diff               removals = actual − desired, installs = desired − actual
//!   │                        removals leave ActualSet here
//!   ├─ 4. update pass        every module in ActualSet:
//!   │                          artifact gone  → uninstall, forget
//!   │                          artifact newer → update in place, may start again
//!   ├─ 5. removal pass       uninstall the diff's removals
//!   ├─ 6. install pass       install the diff's installs
//!   ├─ 7. resolve            best-effort, never an operation error
//!   └─ 8. start pass         at most one start per module epoch
//! ```
//!
//! Steps 3, 5 and 6 only run on a reload cycle, except that
//! [`InstallRetry::EveryCycle`](crate::InstallRetry::EveryCycle) retries
//! desired-but-missing modules on every cycle.
//!
//! ## Failure tracking
//! A module id is marked right before `start` is called, whatever the
//! outcome, and is never started again until it is uninstalled, updated or
//! reinstalled. `NoStart` modules are not marked, so a later reload with a
//! different policy starts them.

mod reconciler;

pub use reconciler::Reconciler;
