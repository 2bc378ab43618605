//! # MainThreadDispatcher: run submitted closures on one designated thread.
//!
//! ```text
//! MainThreadDispatcher::run(stopping)
//! loop {
//!   select! (biased) {
//!     stopping.cancelled() → break
//!     rx.recv()            → catch_unwind(work)   (panic → WorkPanicked)
//!   }
//! }
//! rx.close()               → later execute() calls fail with Closed
//! drain rx                 → queued work is dropped, counted in DispatcherStopped
//! ```
//!
//! The loop runs on whichever thread drives the `run` future; the launcher
//! drives it with `block_on` from the process main thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::dispatch::DispatchError;
use crate::events::{Bus, Event, EventKind, panic_message};

/// A unit of work for the main thread.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

const QUEUE_CAPACITY: usize = 1;

/// Handle for submitting work to the main thread.
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<Work>,
    thread: Arc<str>,
    bus: Bus,
}

impl DispatchHandle {
    /// Queues `work` without blocking.
    ///
    /// Fails with [`DispatchError::Full`] while a previous item is still
    /// waiting, and with [`DispatchError::Closed`] once the loop has exited.
    pub fn execute(&self, work: impl FnOnce() + Send + 'static) -> Result<(), DispatchError> {
        match self.tx.try_send(Box::new(work)) {
            Ok(()) => {
                self.bus
                    .publish(Event::new(EventKind::WorkEnqueued).with_module(self.thread.clone()));
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.bus.publish(
                    Event::new(EventKind::WorkRejected)
                        .with_module(self.thread.clone())
                        .with_reason("full"),
                );
                Err(DispatchError::Full)
            }
            Err(TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }

    /// Name of the thread the work runs on.
    pub fn thread(&self) -> &str {
        &self.thread
    }
}

/// Consumer side of the main-thread queue.
pub struct MainThreadDispatcher {
    rx: mpsc::Receiver<Work>,
    handle: DispatchHandle,
}

impl MainThreadDispatcher {
    /// Creates the queue; nothing runs until [`run`](Self::run) is awaited.
    pub fn new(thread: impl Into<Arc<str>>, bus: Bus) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        Self {
            rx,
            handle: DispatchHandle {
                tx,
                thread: thread.into(),
                bus,
            },
        }
    }

    /// Returns a submission handle.
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Runs queued work until `stopping` is cancelled.
    ///
    /// Returns the number of queued items dropped without running.
    pub async fn run(mut self, stopping: CancellationToken) -> usize {
        loop {
            tokio::select! {
                biased;
                _ = stopping.cancelled() => break,
                work = self.rx.recv() => match work {
                    Some(work) => self.run_work(work),
                    None => break,
                },
            }
        }

        self.rx.close();
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }

        self.handle.bus.publish(
            Event::new(EventKind::DispatcherStopped)
                .with_module(self.handle.thread.clone())
                .with_count(dropped),
        );
        dropped
    }

    fn run_work(&self, work: Work) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(work)) {
            self.handle.bus.publish(
                Event::new(EventKind::WorkPanicked)
                    .with_module(self.handle.thread.clone())
                    .with_reason(panic_message(payload.as_ref())),
            );
        }
    }
}
