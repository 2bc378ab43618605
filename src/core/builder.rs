use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    core::{Config, Launcher},
    events::Bus,
    host::ModuleHost,
    subscribers::{Subscribe, SubscriberSet},
};

/// Default declaration file, relative to the working directory.
pub const DEFAULT_DECLARATION: &str = "launch.properties";

/// Builder for constructing a [`Launcher`].
pub struct LauncherBuilder {
    cfg: Config,
    host: Arc<dyn ModuleHost>,
    declaration: PathBuf,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl LauncherBuilder {
    /// Creates a new builder with the given configuration and host.
    pub fn new(cfg: Config, host: Arc<dyn ModuleHost>) -> Self {
        Self {
            cfg,
            host,
            declaration: PathBuf::from(DEFAULT_DECLARATION),
            subscribers: Vec::new(),
        }
    }

    /// Sets the declaration file watched by the reconciler.
    pub fn declaration(mut self, path: impl Into<PathBuf>) -> Self {
        self.declaration = path.into();
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (module operations, cycle failures,
    /// shutdown) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the launcher.
    ///
    /// Must be called inside a tokio runtime: subscriber workers are spawned here.
    pub fn build(self) -> Launcher {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        Launcher {
            cfg: self.cfg,
            bus,
            subs,
            host: self.host,
            declaration: self.declaration,
        }
    }
}
