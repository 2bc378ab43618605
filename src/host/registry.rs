//! # Host provider registry.
//!
//! Module hosts are discovered through a table of named factories that is
//! resolved exactly once, at bootstrap. The chosen factory builds the
//! [`ModuleHost`] that is then injected into the launcher; nothing after
//! startup performs discovery again.
//!
//! ```text
//! HostRegistry::builtin()
//!   ├─ "local" → LocalHost::open
//!   └─ ...     → register(name, factory)
//!
//! select(Some("local")) → exact match or UnknownHostProvider
//! select(None)          → first registered (warns if several)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::declaration::Properties;
use crate::error::{HostError, RuntimeError};
use crate::host::{LocalHost, ModuleHost};

/// Builds a module host from the launch settings.
pub type HostFactory = fn(&HostSettings) -> Result<Arc<dyn ModuleHost>, HostError>;

/// Settings handed to a [`HostFactory`].
#[derive(Clone, Debug)]
pub struct HostSettings {
    /// Directory the host keeps its private state in.
    pub storage_dir: PathBuf,
    /// Every launch property, passed through untouched.
    pub properties: Properties,
}

impl HostSettings {
    /// Settings with the given storage directory and no extra properties.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            properties: Properties::new(),
        }
    }

    /// Attaches the launch properties.
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }
}

/// A named host factory.
#[derive(Clone, Copy)]
pub struct HostProvider {
    name: &'static str,
    factory: HostFactory,
}

impl HostProvider {
    /// Provider name, matched against the `host` property.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Creates the host.
    pub fn create(&self, settings: &HostSettings) -> Result<Arc<dyn ModuleHost>, HostError> {
        (self.factory)(settings)
    }
}

/// Ordered table of host providers.
#[derive(Default)]
pub struct HostRegistry {
    providers: Vec<HostProvider>,
}

impl HostRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the providers shipped in this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("local", open_local);
        registry
    }

    /// Adds a provider. Lookups by name return the first match.
    pub fn register(&mut self, name: &'static str, factory: HostFactory) -> &mut Self {
        self.providers.push(HostProvider { name, factory });
        self
    }

    /// Registered provider names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.providers.iter().map(|p| p.name)
    }

    /// Picks a provider by name, or the first one when no name is given.
    pub fn select(&self, name: Option<&str>) -> Result<&HostProvider, RuntimeError> {
        match name {
            Some(wanted) => self
                .providers
                .iter()
                .find(|p| p.name == wanted)
                .ok_or_else(|| RuntimeError::UnknownHostProvider {
                    name: wanted.to_string(),
                }),
            None => {
                let first = self.providers.first().ok_or(RuntimeError::NoHostProvider)?;
                if self.providers.len() > 1 {
                    warn!(
                        chosen = first.name,
                        available = self.providers.len(),
                        "multiple module host providers available; using the first"
                    );
                }
                Ok(first)
            }
        }
    }
}

fn open_local(settings: &HostSettings) -> Result<Arc<dyn ModuleHost>, HostError> {
    let host: Arc<dyn ModuleHost> = LocalHost::open(settings)?;
    Ok(host)
}
