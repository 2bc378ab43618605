//! # Launcher: wires the reconciler, the main-thread loop and shutdown.
//!
//! The [`Launcher`] owns the event bus, the [`SubscriberSet`], the module host
//! and the configuration. [`Launcher::run`] returns once the host has stopped
//! and every component has wound down.
//!
//! ## Threads
//! ```text
//! caller thread (B)                              modvisor-installer (A)
//! ─────────────────                              ──────────────────────
//! run()
//!  ├─ subscriber_listener()   Bus ─► SubscriberSet
//!  ├─ signal_watcher()        SIGINT/SIGTERM/SIGQUIT ─► ShutdownRequested, host.shutdown()
//!  ├─ Static:     driver.run_once()
//!  │  Continuous: spawn thread A ───────────────► current-thread runtime
//!  │                                               CycleDriver::run(stopping.child_token())
//!  ├─ MainThreadDispatcher::run(stopping)          (until host stops)
//!  │    registered with host.register_executor()
//!  ├─ publish HostStopped
//!  ├─ cancel driver token, join thread A ◄──────── InstallerStopped
//!  └─ flush subscribers
//! ```
//!
//! ## Rules
//! - Reconciliation state lives only on thread A (or inline in static mode).
//! - The only thing the two threads share is the host's stopping token.
//! - A host that is already stopping after the first cycle skips the
//!   main-thread loop entirely.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::builder::LauncherBuilder;
use crate::core::driver::CycleDriver;
use crate::core::{Config, SyncMode, shutdown};
use crate::dispatch::MainThreadDispatcher;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::host::ModuleHost;
use crate::reconcile::Reconciler;
use crate::subscribers::SubscriberSet;

/// Name of the reconciliation thread in continuous mode.
pub const INSTALLER_THREAD: &str = "modvisor-installer";

/// Process-level orchestrator.
pub struct Launcher {
    pub(super) cfg: Config,
    pub(super) bus: Bus,
    pub(super) subs: SubscriberSet,
    pub(super) host: Arc<dyn ModuleHost>,
    pub(super) declaration: PathBuf,
}

impl Launcher {
    /// Starts building a launcher for `host`.
    pub fn builder(cfg: Config, host: Arc<dyn ModuleHost>) -> LauncherBuilder {
        LauncherBuilder::new(cfg, host)
    }

    /// Event bus shared by every component.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs until the module host stops.
    pub async fn run(self) -> Result<(), RuntimeError> {
        let Launcher {
            cfg,
            bus,
            subs,
            host,
            declaration,
        } = self;

        let done = CancellationToken::new();
        let listener = subscriber_listener(&bus, subs, done.clone());
        let signals = signal_watcher(&bus, &host);

        let stopping = host.stopping();
        let driver_token = stopping.child_token();
        let reconciler = Reconciler::new(declaration, host.clone(), bus.clone())
            .with_install_retry(cfg.install_retry);
        let mut driver = CycleDriver::new(reconciler, host.clone(), bus.clone(), &cfg);

        let result = match cfg.mode {
            SyncMode::Static => {
                driver.run_once();
                Ok(None)
            }
            SyncMode::Continuous => spawn_installer(driver, driver_token.clone()).map(Some),
        };

        let installer = match result {
            Ok(installer) => {
                if !stopping.is_cancelled() {
                    let dispatcher =
                        MainThreadDispatcher::new(cfg.executor_thread.as_str(), bus.clone());
                    host.register_executor(&cfg.executor_thread, dispatcher.handle());
                    dispatcher.run(stopping.clone()).await;
                }
                bus.publish(Event::new(EventKind::HostStopped));
                installer
            }
            Err(e) => {
                signals.abort();
                done.cancel();
                let _ = listener.await;
                return Err(e);
            }
        };

        driver_token.cancel();
        let joined = match installer {
            Some(handle) => match tokio::task::spawn_blocking(move || handle.join()).await {
                Ok(Ok(())) => Ok(()),
                _ => Err(RuntimeError::InstallerPanicked),
            },
            None => Ok(()),
        };

        signals.abort();
        done.cancel();
        let _ = listener.await;
        joined
    }
}

/// Forwards bus events to the subscribers until `done`, then drains and flushes them.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, done: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => {
                        set.emit(&Event::subscriber_overflow("subscriber_listener", "lagged"));
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = done.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        set.emit(&ev);
                    }
                    break;
                }
            }
        }
        set.shutdown().await;
    })
}

/// Stops the host when the process receives a termination signal.
fn signal_watcher(bus: &Bus, host: &Arc<dyn ModuleHost>) -> JoinHandle<()> {
    let (bus, host) = (bus.clone(), host.clone());
    tokio::spawn(async move {
        let signal = match shutdown::wait_for_shutdown_signal().await {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "cannot watch termination signals");
                return;
            }
        };
        bus.publish(Event::new(EventKind::ShutdownRequested).with_reason(signal));
        if let Err(e) = host.shutdown() {
            bus.publish(Event::new(EventKind::HostShutdownFailed).with_reason(e.to_string()));
        }
    })
}

/// Runs the driver on its own thread with a private current-thread runtime.
fn spawn_installer(
    driver: CycleDriver,
    token: CancellationToken,
) -> Result<thread::JoinHandle<()>, RuntimeError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(RuntimeError::Spawn)?;

    thread::Builder::new()
        .name(INSTALLER_THREAD.to_string())
        .spawn(move || runtime.block_on(driver.run(token)))
        .map_err(RuntimeError::Spawn)
}
