//! Runtime core: configuration, cycle driving and process wiring.
//!
//! The public API from this module is [`Launcher`] (built with
//! [`LauncherBuilder`]), the [`CycleDriver`] it runs, and [`Config`].
//!
//! Internal modules:
//! - [`config`]: launcher settings and property keys;
//! - [`driver`]: repeats reconciliation cycles and escalates errors;
//! - [`launcher`]: threads, main-thread loop and shutdown ordering;
//! - [`builder`]: launcher construction;
//! - [`shutdown`]: cross-platform termination signals.

mod builder;
mod config;
mod driver;
mod launcher;
mod shutdown;

pub use builder::{DEFAULT_DECLARATION, LauncherBuilder};
pub use config::{Config, LogOutput, SyncMode, keys, parse_log_level};
pub use driver::{CycleDriver, CycleOutcome};
pub use launcher::{INSTALLER_THREAD, Launcher};
