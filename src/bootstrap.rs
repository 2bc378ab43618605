//! # Process bootstrap.
//!
//! Everything that happens before the [`Launcher`] takes over:
//!
//! ```text
//! launch(properties, debug)
//!   ├─ load_properties()   missing file → defaults
//!   ├─ Config::from_properties()
//!   ├─ init_logging()      tracing-subscriber fmt, console or append-mode file
//!   ├─ prepare_storage()   resolve against cwd, wipe if `clean`
//!   ├─ HostRegistry::builtin().select(host)
//!   ├─ provider.create(HostSettings)
//!   └─ multi-thread runtime ─ block_on(Launcher::run)
//! ```
//!
//! The same properties file is both the launcher configuration and the
//! declaration the reconciler watches.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn};

use crate::core::{Config, Launcher, LogOutput};
use crate::declaration::Properties;
use crate::error::RuntimeError;
use crate::host::{HostRegistry, HostSettings};
use crate::subscribers::Subscribe;

/// Reads the launch properties; a missing file yields empty properties.
pub fn load_properties(path: &Path) -> Result<Properties, RuntimeError> {
    match Properties::load(path) {
        Ok(props) => Ok(props),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Properties::new()),
        Err(source) => Err(RuntimeError::Properties {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Installs the global `tracing` subscriber.
///
/// `debug` raises the configured level to at least DEBUG. A log file that
/// cannot be opened falls back to the console.
pub fn init_logging(cfg: &Config, debug: bool) -> Result<(), RuntimeError> {
    let level = if debug {
        cfg.log_level.max(LevelFilter::DEBUG)
    } else {
        cfg.log_level
    };
    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true);

    let result = match &cfg.log_output {
        LogOutput::Console => builder.with_writer(io::stderr).try_init(),
        LogOutput::File(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => builder.with_writer(Mutex::new(file)).with_ansi(false).try_init(),
            Err(e) => {
                let result = builder.with_writer(io::stderr).try_init();
                warn!(path = %path.display(), error = %e, "cannot open log file; logging to the console");
                result
            }
        },
    };
    result.map_err(|e| RuntimeError::Logging {
        reason: e.to_string(),
    })
}

/// Resolves the storage directory and creates it, wiping it first if asked.
///
/// A requested wipe that fails aborts startup instead of running on stale
/// storage.
pub fn prepare_storage(cfg: &Config) -> Result<PathBuf, RuntimeError> {
    let dir = if cfg.storage_dir.is_absolute() {
        cfg.storage_dir.clone()
    } else {
        std::env::current_dir()
            .map_err(|source| RuntimeError::Storage {
                path: cfg.storage_dir.clone(),
                source,
            })?
            .join(&cfg.storage_dir)
    };
    let storage_err = |source| RuntimeError::Storage {
        path: dir.clone(),
        source,
    };

    if cfg.clean_storage {
        match fs::remove_dir_all(&dir) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(storage_err(e)),
            _ => debug!(path = %dir.display(), "storage directory cleaned"),
        }
    }
    fs::create_dir_all(&dir).map_err(storage_err)?;
    Ok(dir)
}

/// Boots the launcher from a properties file and blocks until the host stops.
pub fn launch(properties: &Path, debug: bool) -> Result<(), RuntimeError> {
    let props = load_properties(properties)?;
    let cfg = Config::from_properties(&props);
    init_logging(&cfg, debug)?;

    let storage = prepare_storage(&cfg)?;
    let registry = HostRegistry::builtin();
    let provider = registry.select(cfg.host_provider.as_deref())?;
    info!(
        provider = provider.name(),
        storage = %storage.display(),
        declaration = %properties.display(),
        "starting module host"
    );
    let host = provider.create(&HostSettings::new(storage).with_properties(props))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(RuntimeError::Spawn)?;

    let declaration = properties.to_path_buf();
    runtime.block_on(async move {
        Launcher::builder(cfg, host)
            .declaration(declaration)
            .with_subscribers(default_subscribers())
            .build()
            .run()
            .await
    })
}

#[cfg(feature = "logging")]
fn default_subscribers() -> Vec<Arc<dyn Subscribe>> {
    vec![Arc::new(crate::subscribers::LogWriter::new())]
}

#[cfg(not(feature = "logging"))]
fn default_subscribers() -> Vec<Arc<dyn Subscribe>> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_properties_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let props = load_properties(&dir.path().join("absent.properties")).unwrap();
        assert!(props.is_empty());
    }

    #[test]
    fn unreadable_properties_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_properties(dir.path()).unwrap_err();
        assert_eq!(err.as_label(), "runtime_properties");
    }

    #[test]
    fn latin1_properties_file_still_boots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launch.properties");
        fs::write(&path, b"# caf\xe9\nmodvisor.shutdownOnError = true\n").unwrap();

        let cfg = Config::from_properties(&load_properties(&path).unwrap());
        assert!(cfg.shutdown_on_error);
    }

    #[test]
    fn failed_clean_aborts_startup() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();

        let cfg = Config {
            storage_dir: blocker.join("runtimefw"),
            clean_storage: true,
            ..Config::default()
        };
        let err = prepare_storage(&cfg).unwrap_err();
        assert_eq!(err.as_label(), "runtime_storage");
        assert!(blocker.is_file());
    }

    #[test]
    fn storage_is_created_and_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("runtimefw");
        fs::create_dir_all(&storage).unwrap();
        fs::write(storage.join("stale"), "x").unwrap();

        let mut cfg = Config {
            storage_dir: storage.clone(),
            ..Config::default()
        };
        assert_eq!(prepare_storage(&cfg).unwrap(), storage);
        assert!(storage.join("stale").exists());

        cfg.clean_storage = true;
        prepare_storage(&cfg).unwrap();
        assert!(storage.is_dir());
        assert!(!storage.join("stale").exists());
    }

    #[test]
    fn relative_storage_resolves_against_cwd() {
        let cfg = Config {
            storage_dir: PathBuf::from("modvisor-test-storage-relative"),
            ..Config::default()
        };
        let dir = prepare_storage(&cfg).unwrap();
        assert!(dir.is_absolute());
        assert!(dir.ends_with("modvisor-test-storage-relative"));
        fs::remove_dir_all(dir).unwrap();
    }
}
