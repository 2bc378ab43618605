//! # CycleDriver: runs reconciliation cycles and escalates errors.
//!
//! Repeats [`Reconciler::synchronize`] on a fixed delay until cancelled, or
//! runs it once in static mode (the launcher calls [`CycleDriver::run_once`]
//! directly).
//!
//! ## Architecture
//! ```text
//! CycleDriver::run(token)
//! loop {
//!   ├─► token cancelled?            → break
//!   ├─► run_once()
//!   │     ├─► reconciler.synchronize() → errors
//!   │     ├─► errors empty          → Continue
//!   │     └─► errors present:
//!   │           ├─ log + publish CycleFailed{count}
//!   │           ├─ log + publish OperationFailed per error
//!   │           └─ shutdown_on_error?
//!   │                 ├─ publish ShutdownOnError
//!   │                 ├─ host.shutdown()   (failure → HostShutdownFailed)
//!   │                 └─ Halt           → break
//!   └─► select! { sleep(interval), token.cancelled() → break }
//! }
//! publish InstallerStopped
//! ```
//!
//! ## Rules
//! - Every operation error is logged through `tracing` here. The bus events
//!   are extra observability and may be dropped when a receiver lags.
//! - A cycle that has started always completes; cancellation is only seen
//!   between cycles and during the sleep.
//! - The driver owns the reconciler, so reconciliation state never leaves
//!   the driver's thread.

use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::core::Config;
use crate::error::HostError;
use crate::events::{Bus, Event, EventKind};
use crate::host::ModuleHost;
use crate::reconcile::Reconciler;

/// What the driver does after a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Keep cycling.
    Continue,
    /// Stop: the host was asked to shut down because of errors.
    Halt,
}

/// Runs the [`Reconciler`] once or on a fixed interval.
pub struct CycleDriver {
    reconciler: Reconciler,
    host: Arc<dyn ModuleHost>,
    bus: Bus,
    interval: Duration,
    shutdown_on_error: bool,
}

impl CycleDriver {
    /// Creates a driver using the interval and escalation settings of `cfg`.
    pub fn new(reconciler: Reconciler, host: Arc<dyn ModuleHost>, bus: Bus, cfg: &Config) -> Self {
        Self {
            reconciler,
            host,
            bus,
            interval: cfg.interval,
            shutdown_on_error: cfg.shutdown_on_error,
        }
    }

    /// The driven reconciler.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Runs one cycle and reports its errors.
    pub fn run_once(&mut self) -> CycleOutcome {
        let errors = self.reconciler.synchronize();
        if errors.is_empty() {
            return CycleOutcome::Continue;
        }

        error!(target: "modvisor", count = errors.len(), "{} ERROR(S) OCCURRED", errors.len());
        self.bus
            .publish(Event::new(EventKind::CycleFailed).with_count(errors.len()));
        for (index, err) in errors.iter().enumerate() {
            error!(
                target: "modvisor",
                label = err.cause().map_or("operation", HostError::as_label),
                "{index} MODULE {}: {}",
                err.location(),
                err.as_message()
            );
            self.bus.publish(
                Event::new(EventKind::OperationFailed)
                    .with_module(err.location().as_str())
                    .with_reason(err.as_message())
                    .with_count(index),
            );
        }

        if !self.shutdown_on_error {
            return CycleOutcome::Continue;
        }

        self.bus.publish(Event::new(EventKind::ShutdownOnError));
        if let Err(e) = self.host.shutdown() {
            self.bus.publish(
                Event::new(EventKind::HostShutdownFailed).with_reason(e.to_string()),
            );
        }
        CycleOutcome::Halt
    }

    /// Cycles until `token` is cancelled or a cycle halts the driver.
    pub async fn run(mut self, token: CancellationToken) {
        loop {
            if token.is_cancelled() {
                break;
            }
            if self.run_once() == CycleOutcome::Halt {
                break;
            }
            select! {
                _ = time::sleep(self.interval) => {}
                _ = token.cancelled() => break,
            }
        }
        self.bus.publish(Event::new(EventKind::InstallerStopped));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tokio::sync::broadcast;

    use crate::host::ModuleLocation;
    use crate::host::mock::{MockHost, Op, OpKind};

    struct Setup {
        dir: tempfile::TempDir,
        host: Arc<MockHost>,
        bus: Bus,
        missing: ModuleLocation,
    }

    /// Declares one artifact that does not exist and makes installs of it fail.
    fn setup() -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("a.jar");
        fs::write(
            dir.path().join("launch.properties"),
            format!("modvisor.runModules = {}\n", artifact.display()),
        )
        .unwrap();
        let missing = ModuleLocation::from_path(artifact.to_str().unwrap());
        let host = MockHost::new();
        host.fail(OpKind::Install, &missing);
        Setup {
            dir,
            host,
            bus: Bus::new(256),
            missing,
        }
    }

    fn driver(s: &Setup, cfg: &Config) -> CycleDriver {
        let decl = s.dir.path().join("launch.properties");
        let reconciler = Reconciler::new(decl, s.host.clone(), s.bus.clone());
        CycleDriver::new(reconciler, s.host.clone(), s.bus.clone(), cfg)
    }

    fn kinds(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        std::iter::from_fn(|| rx.try_recv().ok().map(|e| e.kind)).collect()
    }

    #[test]
    fn errors_are_reported_without_escalation() {
        let s = setup();
        let mut rx = s.bus.subscribe();
        let mut d = driver(&s, &Config::default());

        assert_eq!(d.run_once(), CycleOutcome::Continue);

        let seen = kinds(&mut rx);
        assert!(seen.contains(&EventKind::CycleFailed));
        assert!(seen.contains(&EventKind::OperationFailed));
        assert!(!seen.contains(&EventKind::ShutdownOnError));
        assert!(!s.host.ops().contains(&Op::Shutdown));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[test]
    fn every_error_is_logged_even_when_the_bus_lags() {
        let dir = tempfile::tempdir().unwrap();
        let host = MockHost::new();
        let entries: Vec<String> = (0..40)
            .map(|i| {
                let path = dir.path().join(format!("m{i}.jar"));
                host.fail(OpKind::Install, &ModuleLocation::from_path(path.to_str().unwrap()));
                path.display().to_string()
            })
            .collect();
        let decl = dir.path().join("launch.properties");
        fs::write(&decl, format!("modvisor.runModules = {}\n", entries.join(", "))).unwrap();

        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let reconciler = Reconciler::new(decl, host.clone(), bus.clone());
        let mut d = CycleDriver::new(reconciler, host.clone(), bus, &Config::default());

        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::ERROR)
            .finish();
        tracing::subscriber::with_default(subscriber, || d.run_once());

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
        let text = logs.text();
        assert!(text.contains("40 ERROR(S) OCCURRED"));
        assert_eq!(text.matches("Error installing module").count(), 40);
    }

    #[test]
    fn shutdown_on_error_stops_the_host() {
        let s = setup();
        let mut rx = s.bus.subscribe();
        let cfg = Config {
            shutdown_on_error: true,
            ..Config::default()
        };
        let mut d = driver(&s, &cfg);

        assert_eq!(d.run_once(), CycleOutcome::Halt);

        let events: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let failed = events
            .iter()
            .find(|e| e.kind == EventKind::OperationFailed)
            .unwrap();
        assert_eq!(failed.module.as_deref(), Some(s.missing.as_str()));
        assert_eq!(failed.count, Some(0));
        assert!(failed.reason.as_deref().unwrap().starts_with("Error installing module"));
        assert_eq!(events.last().map(|e| e.kind), Some(EventKind::ShutdownOnError));
        assert!(s.host.ops().contains(&Op::Shutdown));
        assert!(s.host.stopping().is_cancelled());
    }

    #[test]
    fn refused_host_shutdown_is_reported() {
        let s = setup();
        s.host.fail_shutdown();
        let mut rx = s.bus.subscribe();
        let cfg = Config {
            shutdown_on_error: true,
            ..Config::default()
        };
        let mut d = driver(&s, &cfg);

        assert_eq!(d.run_once(), CycleOutcome::Halt);
        assert!(kinds(&mut rx).contains(&EventKind::HostShutdownFailed));
    }

    #[tokio::test]
    async fn run_ends_by_itself_after_halt() {
        let s = setup();
        let mut rx = s.bus.subscribe();
        let cfg = Config {
            shutdown_on_error: true,
            ..Config::default()
        };

        driver(&s, &cfg).run(CancellationToken::new()).await;

        assert_eq!(kinds(&mut rx).last(), Some(&EventKind::InstallerStopped));
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_sleep() {
        let s = setup();
        let cfg = Config {
            interval: Duration::from_secs(3600),
            ..Config::default()
        };
        let token = CancellationToken::new();
        let task = tokio::spawn(driver(&s, &cfg).run(token.clone()));

        time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        time::timeout(Duration::from_secs(5), task)
            .await
            .expect("driver did not stop")
            .unwrap();
        let installs = s
            .host
            .ops()
            .iter()
            .filter(|op| matches!(op, Op::Install(_)))
            .count();
        assert_eq!(installs, 1);
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_cycle() {
        let s = setup();
        let token = CancellationToken::new();
        token.cancel();

        driver(&s, &Config::default()).run(token).await;

        assert!(s.host.ops().is_empty());
    }
}
