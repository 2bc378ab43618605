//! # modvisor
//!
//! **Modvisor** is a reconciling launcher for pluggable module hosts.
//!
//! It reads a declaration file listing module artifacts and their start
//! policies, and keeps driving the host's live module set toward it: install,
//! update, uninstall, resolve and start, with at most one start attempt per
//! module epoch so broken modules do not thrash.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   launch.properties ──► Declaration (location → StartPolicy)
//!                                │
//! ┌──────────────────────────────▼────────────────────────────────────┐
//! │  Launcher (process wiring)                                        │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers, LogWriter)        │
//! │  - ModuleHost (selected once through HostRegistry)                │
//! └──────┬───────────────────────────────────────────┬────────────────┘
//!        ▼ thread A: modvisor-installer              ▼ thread B: caller
//!  ┌───────────────────────────┐             ┌──────────────────────────┐
//!  │ CycleDriver               │             │ MainThreadDispatcher     │
//!  │  every 2s (or once):      │             │  capacity-1 work queue   │
//!  │  Reconciler::synchronize  │             │  DispatchHandle ─► host  │
//!  └───────────┬───────────────┘             └──────────────────────────┘
//!              │ install / update / uninstall / resolve / start
//!              ▼
//!        ModuleHost (LocalHost, or any registered provider)
//!
//!  both threads stop on host.stopping() (CancellationToken)
//! ```
//!
//! ### Cycle
//! ```text
//! change detection ─► reload ─► diff ─► update ─► removal ─► install ─► resolve ─► start
//!   (mtime strictly newer)                                                      (≤1 per epoch)
//! errors ─► CycleFailed + OperationFailed events ─► shutdown_on_error? ─► host.shutdown()
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                         |
//! |-------------------|--------------------------------------------------------------|--------------------------------------------|
//! | **Reconciliation**| One convergence cycle over the declared module set.           | [`Reconciler`], [`Declaration`]            |
//! | **Driving**       | Continuous or single-pass cycling with fail-fast escalation. | [`CycleDriver`], [`Config`]                |
//! | **Hosts**         | Capability contract and provider discovery.                  | [`ModuleHost`], [`HostRegistry`], [`LocalHost`] |
//! | **Main thread**   | Bounded, reject-on-full work queue.                          | [`MainThreadDispatcher`], [`DispatchHandle`] |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, alerts).         | [`Subscribe`], [`Event`]                   |
//! | **Errors**        | Typed errors for hosts, operations and the runtime.          | [`HostError`], [`OperationError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] and the `modvisor` binary.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use modvisor::{Config, HostSettings, Launcher, LocalHost, ModuleHost, Subscribe};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let host: Arc<dyn ModuleHost> = LocalHost::open(&HostSettings::new("runtimefw"))?;
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(modvisor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     Launcher::builder(cfg, host)
//!         .declaration("launch.properties")
//!         .with_subscribers(subs)
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
mod bootstrap;
mod core;
mod declaration;
mod dispatch;
mod error;
mod events;
mod host;
mod policies;
mod reconcile;
mod subscribers;

// ---- Public re-exports ----

pub use bootstrap::{init_logging, launch, load_properties, prepare_storage};
pub use core::{
    Config, CycleDriver, CycleOutcome, DEFAULT_DECLARATION, INSTALLER_THREAD, Launcher,
    LauncherBuilder, LogOutput, SyncMode, keys, parse_log_level,
};
pub use declaration::{Declaration, Properties};
pub use dispatch::{DispatchError, DispatchHandle, MainThreadDispatcher, Work};
pub use error::{HostError, OperationError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use host::{
    HostFactory, HostProvider, HostRegistry, HostSettings, LOCATION_SCHEME, LocalHost,
    ModuleHost, ModuleId, ModuleLocation, ModuleSnapshot, ModuleState,
};
pub use policies::{InstallRetry, StartPolicy};
pub use reconcile::Reconciler;
pub use subscribers::{Subscribe, SubscriberSet};

// Built-in tracing-backed subscriber.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
