//! # Module host capability contract.
//!
//! The launcher never loads module code itself. Every lifecycle primitive
//! (install, update, uninstall, resolve, start) is delegated to a
//! [`ModuleHost`] implementation that is selected once at startup through the
//! [`HostRegistry`].
//!
//! ## Identity model
//! ```text
//! ModuleLocation ("file:/mods/a.jar")  ── install ──►  ModuleId (host-owned)
//!        │                                                 │
//!        └── key of DesiredSet / ActualSet                 └── key of StartAttempted
//! ```
//!
//! - [`ModuleLocation`] is an opaque, immutable key (typically `file:` + path).
//! - [`ModuleId`] identifies one live module instance inside the host. The
//!   reconciler only keeps ids for bookkeeping; it never creates or destroys them.
//! - [`ModuleId::SYSTEM`] is the host's own module and is never managed.

mod local;
mod registry;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;

use crate::dispatch::DispatchHandle;
use crate::error::HostError;
use crate::policies::StartPolicy;

pub use local::LocalHost;
pub use registry::{HostFactory, HostProvider, HostRegistry, HostSettings};

/// Scheme marker prefixed to artifact paths to form a [`ModuleLocation`].
pub const LOCATION_SCHEME: &str = "file:";

/// Opaque key identifying a module artifact.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleLocation(Arc<str>);

impl ModuleLocation {
    /// Wraps a raw location string as-is.
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    /// Builds a location from an artifact path by prefixing [`LOCATION_SCHEME`].
    pub fn from_path(path: &str) -> Self {
        Self(format!("{LOCATION_SCHEME}{path}").into())
    }

    /// Returns the raw location string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the location uses the [`LOCATION_SCHEME`] marker.
    pub fn is_file_scheme(&self) -> bool {
        self.0.starts_with(LOCATION_SCHEME)
    }

    /// Path of the backing artifact on storage.
    ///
    /// Strips the scheme marker when present; otherwise the whole string is
    /// taken as a path.
    pub fn artifact_path(&self) -> PathBuf {
        PathBuf::from(self.0.strip_prefix(LOCATION_SCHEME).unwrap_or(&self.0))
    }
}

impl fmt::Display for ModuleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-assigned identity of one live module instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub u64);

impl ModuleId {
    /// The host's own (system) module.
    pub const SYSTEM: ModuleId = ModuleId(0);
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a module as reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleState {
    /// Installed but dependencies not resolved.
    Installed,
    /// Dependencies resolved, not running.
    Resolved,
    /// Waiting for activation (lazy activation policy).
    Starting,
    /// Running.
    Active,
    /// Removed from the host; the record is only a tombstone.
    Uninstalled,
}

/// Point-in-time view of one module.
#[derive(Clone, Debug)]
pub struct ModuleSnapshot {
    /// Host identity.
    pub id: ModuleId,
    /// Location the module was installed from.
    pub location: ModuleLocation,
    /// Time of the last install or update.
    pub last_modified: SystemTime,
    /// Current lifecycle state.
    pub state: ModuleState,
    /// True for fragment-like modules that declare no runnable unit.
    pub fragment: bool,
}

/// # Capability contract every module host implements.
///
/// All calls are blocking and synchronous from the caller's point of view.
/// Implementations may be internally concurrent, hence `Send + Sync`.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use modvisor::{HostSettings, LocalHost, ModuleHost, ModuleLocation, StartPolicy};
///
/// let host: Arc<dyn ModuleHost> = LocalHost::open(&HostSettings::new("runtimefw")).unwrap();
/// let id = host.install(&ModuleLocation::from_path("/mods/a.jar")).unwrap();
/// host.start(id, StartPolicy::Start).unwrap();
/// ```
pub trait ModuleHost: Send + Sync + 'static {
    /// Snapshot of every installed module (used once, at startup).
    fn modules(&self) -> Vec<ModuleSnapshot>;

    /// Current view of one module, `None` if the host never knew it.
    fn snapshot(&self, id: ModuleId) -> Option<ModuleSnapshot>;

    /// Installs the module at `location` and returns its identity.
    fn install(&self, location: &ModuleLocation) -> Result<ModuleId, HostError>;

    /// Uninstalls a module. Fails if it is already uninstalled.
    fn uninstall(&self, id: ModuleId) -> Result<(), HostError>;

    /// Replaces a module's content in place.
    fn update(&self, id: ModuleId, content: &mut dyn Read) -> Result<(), HostError>;

    /// Starts a module with the given policy.
    fn start(&self, id: ModuleId, policy: StartPolicy) -> Result<(), HostError>;

    /// Resolves dependencies of all modules (best-effort).
    ///
    /// Hosts without a resolver keep the default, which reports
    /// [`HostError::Unsupported`].
    fn resolve_all(&self) -> Result<(), HostError> {
        Err(HostError::Unsupported)
    }

    /// Exposes the main-thread executor to the host's modules.
    fn register_executor(&self, _thread: &str, _executor: DispatchHandle) {}

    /// Begins host-level termination.
    fn shutdown(&self) -> Result<(), HostError>;

    /// Token cancelled once the host starts stopping.
    fn stopping(&self) -> CancellationToken;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_round_trips_artifact_path() {
        let loc = ModuleLocation::from_path("/mods/a.jar");
        assert_eq!(loc.as_str(), "file:/mods/a.jar");
        assert!(loc.is_file_scheme());
        assert_eq!(loc.artifact_path(), PathBuf::from("/mods/a.jar"));
    }

    #[test]
    fn location_without_scheme_is_taken_as_path() {
        let loc = ModuleLocation::new("/mods/b.jar");
        assert!(!loc.is_file_scheme());
        assert_eq!(loc.artifact_path(), PathBuf::from("/mods/b.jar"));
    }
}
