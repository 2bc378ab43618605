//! # Launcher configuration.
//!
//! Provides [`Config`] centralized settings for the launcher runtime, and the
//! property [`keys`] they are read from.
//!
//! Config is used in two ways:
//! 1. **Bootstrap**: logging, storage directory and host provider selection.
//! 2. **Launcher creation**: `Launcher::builder(config, host)` hands the
//!    reconciliation settings to the cycle driver and dispatcher.
//!
//! Config is read once at startup. The module list and default start policy
//! are not part of it: those are re-read by the reconciler whenever the
//! declaration file changes.

use std::path::PathBuf;
use std::time::Duration;

use tracing::level_filters::LevelFilter;

use crate::declaration::Properties;
use crate::policies::InstallRetry;

/// Property keys understood by the launcher.
pub mod keys {
    /// Namespace shared by all launcher keys.
    pub const NAMESPACE: &str = "modvisor";

    /// Comma separated `path[;start=token]` module list.
    pub const RUN_MODULES: &str = "modvisor.runModules";
    /// Default start policy token.
    pub const DEFAULT_START: &str = "modvisor.defaultStart";
    /// `true` for continuous reconciliation, `false` for a single pass.
    pub const DYNAMIC_MODULES: &str = "modvisor.dynamicModules";
    /// `true` to stop the host when a cycle reports errors.
    pub const SHUTDOWN_ON_ERROR: &str = "modvisor.shutdownOnError";
    /// `reload` or `cycle`.
    pub const INSTALL_RETRY: &str = "modvisor.installRetry";

    /// Log level name.
    pub const LOG_LEVEL: &str = "modvisor.logLevel";
    /// `console` or `file:<path>`.
    pub const LOG_OUTPUT: &str = "modvisor.logOutput";

    /// Host storage directory.
    pub const STORAGE_DIR: &str = "modvisor.storageDir";
    /// `true` to wipe the storage directory before the host starts.
    pub const CLEAN: &str = "modvisor.clean";

    /// Module host provider name.
    pub const HOST: &str = "modvisor.host";
}

/// Whether the declaration is reconciled once or continuously.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncMode {
    /// Reconcile on a fixed interval until the host stops.
    Continuous,
    /// Reconcile exactly once, before the main-thread loop starts.
    Static,
}

/// Where log records go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogOutput {
    /// Standard error.
    Console,
    /// Appended to a file (falls back to the console if it cannot be opened).
    File(PathBuf),
}

impl LogOutput {
    /// Parses `console` or `file:<path>`; anything else means console.
    pub fn parse(value: &str) -> Self {
        match value.trim().strip_prefix("file:") {
            Some(path) if !path.is_empty() => LogOutput::File(PathBuf::from(path)),
            _ => LogOutput::Console,
        }
    }
}

/// Parses a log level, accepting both `java.util.logging` names and `tracing` names.
///
/// # Example
/// ```
/// use modvisor::parse_log_level;
/// use tracing::level_filters::LevelFilter;
///
/// assert_eq!(parse_log_level("FINE"), Some(LevelFilter::DEBUG));
/// assert_eq!(parse_log_level("warn"), Some(LevelFilter::WARN));
/// ```
pub fn parse_log_level(value: &str) -> Option<LevelFilter> {
    let level = match value.trim().to_ascii_uppercase().as_str() {
        "OFF" => LevelFilter::OFF,
        "SEVERE" | "ERROR" => LevelFilter::ERROR,
        "WARNING" | "WARN" => LevelFilter::WARN,
        "INFO" | "CONFIG" => LevelFilter::INFO,
        "FINE" | "DEBUG" => LevelFilter::DEBUG,
        "FINER" | "FINEST" | "ALL" | "TRACE" => LevelFilter::TRACE,
        _ => return None,
    };
    Some(level)
}

/// Global configuration for the launcher runtime.
///
/// ## Field semantics
/// - `mode`: continuous loop or single pass
/// - `interval`: delay between cycles in continuous mode (fixed, not read from properties)
/// - `shutdown_on_error`: stop the host after any cycle that reports errors
/// - `install_retry`: when failed installs are retried
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `executor_thread`: name the main-thread executor is registered under
///
/// ## Notes
/// All fields are public for flexibility; [`Config::from_properties`] is the
/// usual way to build one.
#[derive(Clone, Debug)]
pub struct Config {
    /// Reconcile continuously or once.
    pub mode: SyncMode,

    /// Delay between two cycles in [`SyncMode::Continuous`].
    ///
    /// The wait is cancellable: a host shutdown wakes the driver immediately.
    pub interval: Duration,

    /// Stop the host when a cycle returns any operation error.
    pub shutdown_on_error: bool,

    /// Retry behavior for failed installs.
    pub install_retry: InstallRetry,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Thread name the main-thread executor is registered under.
    pub executor_thread: String,

    /// Maximum level for log output.
    pub log_level: LevelFilter,

    /// Log destination.
    pub log_output: LogOutput,

    /// Host storage directory (relative paths are resolved by bootstrap).
    pub storage_dir: PathBuf,

    /// Wipe the storage directory before the host starts.
    pub clean_storage: bool,

    /// Module host provider name; `None` picks the first registered provider.
    pub host_provider: Option<String>,
}

impl Config {
    /// Reads configuration from launch properties, using defaults for missing
    /// or unparsable values.
    pub fn from_properties(props: &Properties) -> Self {
        let defaults = Self::default();
        Self {
            mode: if props.get_bool(keys::DYNAMIC_MODULES, true) {
                SyncMode::Continuous
            } else {
                SyncMode::Static
            },
            shutdown_on_error: props.get_bool(keys::SHUTDOWN_ON_ERROR, false),
            install_retry: props
                .get(keys::INSTALL_RETRY)
                .and_then(InstallRetry::parse)
                .unwrap_or(defaults.install_retry),
            log_level: props
                .get(keys::LOG_LEVEL)
                .and_then(parse_log_level)
                .unwrap_or(defaults.log_level),
            log_output: props
                .get(keys::LOG_OUTPUT)
                .map(LogOutput::parse)
                .unwrap_or(defaults.log_output),
            storage_dir: props
                .get(keys::STORAGE_DIR)
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            clean_storage: props.get_bool(keys::CLEAN, false),
            host_provider: props
                .get(keys::HOST)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            ..defaults
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `mode = Continuous`, `interval = 2s`
    /// - `shutdown_on_error = false`
    /// - `install_retry = OnReload`
    /// - `bus_capacity = 1024`
    /// - `executor_thread = "main"`
    /// - `log_level = WARN`, `log_output = Console`
    /// - `storage_dir = "runtimefw"`, `clean_storage = false`
    fn default() -> Self {
        Self {
            mode: SyncMode::Continuous,
            interval: Duration::from_secs(2),
            shutdown_on_error: false,
            install_retry: InstallRetry::default(),
            bus_capacity: 1024,
            executor_thread: "main".to_string(),
            log_level: LevelFilter::WARN,
            log_output: LogOutput::Console,
            storage_dir: PathBuf::from("runtimefw"),
            clean_storage: false,
            host_provider: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_properties_give_defaults() {
        let cfg = Config::from_properties(&Properties::new());
        assert_eq!(cfg.mode, SyncMode::Continuous);
        assert_eq!(cfg.interval, Duration::from_secs(2));
        assert!(!cfg.shutdown_on_error);
        assert_eq!(cfg.install_retry, InstallRetry::OnReload);
        assert_eq!(cfg.log_level, LevelFilter::WARN);
        assert_eq!(cfg.log_output, LogOutput::Console);
        assert_eq!(cfg.storage_dir, PathBuf::from("runtimefw"));
        assert_eq!(cfg.host_provider, None);
    }

    #[test]
    fn reads_every_key() {
        let props = Properties::parse(
            "modvisor.dynamicModules = false\n\
             modvisor.shutdownOnError = True\n\
             modvisor.installRetry = cycle\n\
             modvisor.logLevel = FINE\n\
             modvisor.logOutput = file:/tmp/modvisor.log\n\
             modvisor.storageDir = /var/lib/modvisor\n\
             modvisor.clean = true\n\
             modvisor.host = local\n",
        );
        let cfg = Config::from_properties(&props);
        assert_eq!(cfg.mode, SyncMode::Static);
        assert!(cfg.shutdown_on_error);
        assert_eq!(cfg.install_retry, InstallRetry::EveryCycle);
        assert_eq!(cfg.log_level, LevelFilter::DEBUG);
        assert_eq!(cfg.log_output, LogOutput::File(PathBuf::from("/tmp/modvisor.log")));
        assert_eq!(cfg.storage_dir, PathBuf::from("/var/lib/modvisor"));
        assert!(cfg.clean_storage);
        assert_eq!(cfg.host_provider.as_deref(), Some("local"));
    }

    #[test]
    fn unknown_values_keep_defaults() {
        let props = Properties::parse(
            "modvisor.installRetry = sometimes\nmodvisor.logLevel = LOUD\nmodvisor.logOutput = syslog\n",
        );
        let cfg = Config::from_properties(&props);
        assert_eq!(cfg.install_retry, InstallRetry::OnReload);
        assert_eq!(cfg.log_level, LevelFilter::WARN);
        assert_eq!(cfg.log_output, LogOutput::Console);
    }

    #[test]
    fn java_level_names_map_to_tracing() {
        assert_eq!(parse_log_level("SEVERE"), Some(LevelFilter::ERROR));
        assert_eq!(parse_log_level("config"), Some(LevelFilter::INFO));
        assert_eq!(parse_log_level("FINEST"), Some(LevelFilter::TRACE));
        assert_eq!(parse_log_level("OFF"), Some(LevelFilter::OFF));
        assert_eq!(parse_log_level("nope"), None);
    }
}
