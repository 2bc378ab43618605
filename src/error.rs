//! Error types used by the modvisor runtime and module hosts.
//!
//! This module defines the error enums shared across the crate:
//!
//! - [`HostError`]: failures reported by a [`ModuleHost`](crate::ModuleHost) primitive.
//! - [`OperationError`]: one failed lifecycle operation, collected per reconciliation cycle.
//! - [`RuntimeError`]: failures of the launcher itself (bootstrap, wiring, threads).
//!
//! Each type provides `as_label` for stable log/metric labels.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::host::{ModuleId, ModuleLocation};

/// # Errors reported by a module host.
///
/// Hosts return these from their lifecycle primitives. The reconciler never
/// propagates them directly: it wraps each one into an [`OperationError`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HostError {
    /// The backing artifact for a location does not exist as a regular file.
    #[error("module artifact not found: {location}")]
    ArtifactMissing {
        /// Location whose artifact is missing.
        location: ModuleLocation,
    },

    /// The host has no record of the given module.
    #[error("unknown module {id}")]
    UnknownModule {
        /// Identity that was looked up.
        id: ModuleId,
    },

    /// The module was uninstalled earlier.
    #[error("module {id} is already uninstalled")]
    AlreadyUninstalled {
        /// Identity of the uninstalled module.
        id: ModuleId,
    },

    /// The host does not implement this capability.
    #[error("operation not supported by this host")]
    Unsupported,

    /// The host is stopping and refuses new work.
    #[error("host is stopping")]
    Stopping,

    /// The host refused the operation.
    #[error("{reason}")]
    Rejected {
        /// Host supplied explanation.
        reason: String,
    },

    /// Reading or writing module content failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl HostError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use modvisor::HostError;
    ///
    /// assert_eq!(HostError::Unsupported.as_label(), "host_unsupported");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HostError::ArtifactMissing { .. } => "host_artifact_missing",
            HostError::UnknownModule { .. } => "host_unknown_module",
            HostError::AlreadyUninstalled { .. } => "host_already_uninstalled",
            HostError::Unsupported => "host_unsupported",
            HostError::Stopping => "host_stopping",
            HostError::Rejected { .. } => "host_rejected",
            HostError::Io(_) => "host_io",
        }
    }

    /// Shorthand for a [`HostError::Rejected`] with the given reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        HostError::Rejected {
            reason: reason.into(),
        }
    }
}

/// # One failed lifecycle operation.
///
/// Carries the module location, a short description of what was attempted and
/// the underlying host error, if any. A reconciliation cycle collects these
/// into a list and returns them; they are never raised individually.
#[derive(Error, Debug)]
#[error("{location}: {message}")]
pub struct OperationError {
    location: ModuleLocation,
    message: &'static str,
    #[source]
    cause: Option<HostError>,
}

impl OperationError {
    /// Creates an error with an underlying host cause.
    pub fn new(location: ModuleLocation, message: &'static str, cause: HostError) -> Self {
        Self {
            location,
            message,
            cause: Some(cause),
        }
    }

    /// Creates an error without an underlying cause.
    pub fn bare(location: ModuleLocation, message: &'static str) -> Self {
        Self {
            location,
            message,
            cause: None,
        }
    }

    /// Location of the module the operation was applied to.
    pub fn location(&self) -> &ModuleLocation {
        &self.location
    }

    /// Short description of the failed operation.
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Underlying host error, if any.
    pub fn cause(&self) -> Option<&HostError> {
        self.cause.as_ref()
    }

    /// Message with the cause appended, for single-line logging.
    pub fn as_message(&self) -> String {
        match &self.cause {
            Some(cause) => format!("{}: {cause}", self.message),
            None => self.message.to_string(),
        }
    }
}

/// # Errors produced by the launcher runtime.
///
/// These represent failures of the launcher itself, such as missing host
/// providers or an unusable storage directory. Per-module failures are
/// [`OperationError`]s instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// No module host provider is registered.
    #[error("no module host providers available")]
    NoHostProvider,

    /// A provider was requested by name but is not registered.
    #[error("unknown module host provider `{name}`")]
    UnknownHostProvider {
        /// Requested provider name.
        name: String,
    },

    /// The module host could not be created or started.
    #[error("module host failed: {0}")]
    Host(#[from] HostError),

    /// The launch properties file exists but could not be read.
    #[error("failed to read launch properties {path:?}: {source}")]
    Properties {
        /// Path of the properties file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The storage directory could not be prepared.
    #[error("storage directory {path:?}: {source}")]
    Storage {
        /// Storage directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Logging could not be initialised.
    #[error("logging setup failed: {reason}")]
    Logging {
        /// Description of the failure.
        reason: String,
    },

    /// A runtime thread could not be started.
    #[error("failed to spawn runtime thread: {0}")]
    Spawn(#[source] io::Error),

    /// The reconciliation thread panicked.
    #[error("module installer thread panicked")]
    InstallerPanicked,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use modvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::NoHostProvider.as_label(), "runtime_no_host_provider");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NoHostProvider => "runtime_no_host_provider",
            RuntimeError::UnknownHostProvider { .. } => "runtime_unknown_host_provider",
            RuntimeError::Host(_) => "runtime_host",
            RuntimeError::Properties { .. } => "runtime_properties",
            RuntimeError::Storage { .. } => "runtime_storage",
            RuntimeError::Logging { .. } => "runtime_logging",
            RuntimeError::Spawn(_) => "runtime_spawn",
            RuntimeError::InstallerPanicked => "runtime_installer_panicked",
        }
    }
}
