//! # Runtime events emitted by the reconciler, cycle driver and dispatcher.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Declaration events**: the desired state was (re)loaded or could not be read
//! - **Module events**: lifecycle operations applied to individual modules
//! - **Cycle events**: errors and fail-fast escalation after a cycle
//! - **Runtime events**: shutdown, main-thread work, subscriber health
//!
//! The [`Event`] struct carries metadata such as timestamps, module location,
//! a reason string and a count.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use modvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::OperationFailed)
//!     .with_module("file:/mods/a.jar")
//!     .with_reason("Error installing module")
//!     .with_count(0);
//!
//! assert_eq!(ev.kind, EventKind::OperationFailed);
//! assert_eq!(ev.module.as_deref(), Some("file:/mods/a.jar"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Declaration events ===
    /// Pre-installed modules were adopted at startup.
    ///
    /// Sets:
    /// - `count`: number of adopted modules
    ModulesAdopted,

    /// The declaration file changed and was parsed.
    ///
    /// Sets:
    /// - `count`: number of desired modules
    DeclarationReloaded,

    /// The declaration file could not be read; the previous desired state is kept.
    ///
    /// Sets:
    /// - `reason`: I/O error message
    DeclarationUnreadable,

    // === Module events ===
    /// A module was installed.
    ///
    /// Sets:
    /// - `module`: location
    ModuleInstalled,

    /// A module was updated in place from its artifact.
    ///
    /// Sets:
    /// - `module`: location
    ModuleUpdated,

    /// A module was uninstalled.
    ///
    /// Sets:
    /// - `module`: location
    /// - `reason`: why (`undeclared` or `artifact removed`)
    ModuleUninstalled,

    /// A start is about to be attempted.
    ///
    /// Sets:
    /// - `module`: location
    /// - `reason`: start policy token
    ModuleStarting,

    /// The host resolved module dependencies.
    ModulesResolved,

    /// Dependency resolution failed (not an operation error).
    ///
    /// Sets:
    /// - `reason`: host error message
    ResolveFailed,

    // === Cycle events ===
    /// One lifecycle operation failed.
    ///
    /// Sets:
    /// - `module`: location
    /// - `reason`: operation message and cause
    /// - `count`: index of the error within its cycle
    OperationFailed,

    /// A cycle finished with errors.
    ///
    /// Sets:
    /// - `count`: number of errors
    CycleFailed,

    /// Errors occurred with shutdown-on-error configured; the host is being stopped.
    ShutdownOnError,

    /// The host refused to shut down.
    ///
    /// Sets:
    /// - `reason`: host error message
    HostShutdownFailed,

    // === Runtime events ===
    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// The host reported that it is stopping.
    HostStopped,

    /// The reconciliation loop exited.
    InstallerStopped,

    /// Work was queued for the main thread.
    ///
    /// Sets:
    /// - `module`: executor thread name
    WorkEnqueued,

    /// Work was refused because the main-thread queue is full.
    ///
    /// Sets:
    /// - `module`: executor thread name
    /// - `reason`: `full`
    WorkRejected,

    /// Main-thread work panicked.
    ///
    /// Sets:
    /// - `module`: executor thread name
    /// - `reason`: panic message
    WorkPanicked,

    /// The main-thread loop exited.
    ///
    /// Sets:
    /// - `module`: executor thread name
    /// - `count`: queued work items dropped without running
    DispatcherStopped,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `module`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `module`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Module location (or subscriber/thread name for runtime events).
    pub module: Option<Arc<str>>,
    /// Human-readable reason (errors, policies, overflow details).
    pub reason: Option<Arc<str>>,
    /// Count or index, depending on the kind.
    pub count: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            module: None,
            reason: None,
            count: None,
        }
    }

    /// Attaches a module location (or component name).
    #[inline]
    pub fn with_module(mut self, module: impl Into<Arc<str>>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a count or index.
    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_module(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_module(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

/// Turns a caught panic payload into a message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
