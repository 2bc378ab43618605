//! Start and retry policies.
//!
//! This module groups the knobs that control **how** a module is started and
//! **when** a failed install is attempted again.
//!
//! ## Contents
//! - [`StartPolicy`]  how a module is started (none / start / transient / activation policy)
//! - [`InstallRetry`] when a failed install is retried (on reload / every cycle)
//!
//! ## Quick wiring
//! ```text
//! Declaration { modules: location → StartPolicy, default_start }
//!      └─► reconcile::Reconciler uses:
//!           - StartPolicy to pick the start mode per module
//!           - InstallRetry to decide whether failed installs re-enter the install pass
//! ```
//!
//! ## Defaults
//! - `StartPolicy::Start`
//! - `InstallRetry::OnReload`

mod install;
mod start;

pub use install::InstallRetry;
pub use start::StartPolicy;
