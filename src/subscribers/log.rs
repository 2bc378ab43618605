//! # LogWriter: tracing-backed event logger
//!
//! Turns incoming [`Event`]s into `tracing` records under the `modvisor` target.
//!
//! | level | kinds |
//! |-------|-------|
//! | error | `ShutdownOnError`, `HostShutdownFailed` |
//! | warn  | `DeclarationUnreadable`, `ResolveFailed`, `WorkRejected`, `WorkPanicked`, subscriber issues |
//! | info  | adoption, shutdown and stop milestones |
//! | debug | per-module operations, reloads, main-thread work, `OperationFailed`, `CycleFailed` |
//!
//! Operation errors are already logged at error level by the cycle driver, so
//! their events only show up here at debug level.
//!
//! ## Example output
//! ```text
//! DEBUG modvisor: 0 MODULE file:/mods/a.jar: Error installing module: module artifact not found: file:/mods/a.jar
//! ERROR modvisor: SHUTTING DOWN due to errors
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "modvisor";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let module = e.module.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let count = e.count.unwrap_or_default();

        match e.kind {
            EventKind::OperationFailed => {
                debug!(target: TARGET, "{count} MODULE {module}: {reason}");
            }
            EventKind::CycleFailed => {
                debug!(target: TARGET, "{count} ERROR(S) OCCURRED");
            }
            EventKind::ShutdownOnError => {
                error!(target: TARGET, "SHUTTING DOWN due to errors");
            }
            EventKind::HostShutdownFailed => {
                error!(target: TARGET, reason, "failed to shut down module host");
            }
            EventKind::DeclarationUnreadable => {
                warn!(target: TARGET, reason, "error reading declaration file; keeping previous desired state");
            }
            EventKind::ResolveFailed => {
                warn!(target: TARGET, reason, "module resolution failed");
            }
            EventKind::WorkRejected => {
                warn!(target: TARGET, thread = module, reason, "main-thread work rejected");
            }
            EventKind::WorkPanicked => {
                warn!(target: TARGET, thread = module, reason, "main-thread work panicked");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: TARGET, subscriber = module, reason, "subscriber dropped an event");
            }
            EventKind::SubscriberPanicked => {
                warn!(target: TARGET, subscriber = module, reason, "subscriber panicked");
            }
            EventKind::ModulesAdopted => {
                info!(target: TARGET, "detected {count} pre-installed modules with \"file:\" locations");
            }
            EventKind::ShutdownRequested => {
                info!(target: TARGET, "shutdown requested");
            }
            EventKind::HostStopped => {
                info!(target: TARGET, "module host stopped");
            }
            EventKind::InstallerStopped => {
                info!(target: TARGET, "module installer terminating");
            }
            EventKind::DispatcherStopped => {
                info!(target: TARGET, thread = module, dropped = count, "main-thread executor finished");
            }
            EventKind::DeclarationReloaded => {
                debug!(target: TARGET, modules = count, "declaration file has changed");
            }
            EventKind::ModuleInstalled => {
                debug!(target: TARGET, "installed module {module}");
            }
            EventKind::ModuleUpdated => {
                debug!(target: TARGET, "updated module {module}");
            }
            EventKind::ModuleUninstalled => {
                debug!(target: TARGET, reason, "uninstalled module {module}");
            }
            EventKind::ModuleStarting => {
                debug!(target: TARGET, policy = reason, "starting module {module}");
            }
            EventKind::ModulesResolved => {
                debug!(target: TARGET, "modules resolved");
            }
            EventKind::WorkEnqueued => {
                debug!(target: TARGET, thread = module, "main-thread executor enqueuing a new task");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
