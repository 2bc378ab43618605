use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::declaration::Declaration;
use crate::error::{HostError, OperationError};
use crate::events::{Bus, Event, EventKind};
use crate::host::{ModuleHost, ModuleId, ModuleLocation, ModuleState};
use crate::policies::InstallRetry;

const ERR_UNINSTALL: &str = "Error uninstalling module";
const ERR_ALREADY_UNINSTALLED: &str = "Module is already uninstalled";
const ERR_UPDATE: &str = "Error updating module";
const ERR_UPDATE_OPEN: &str = "Error updating module, its artifact may have been deleted";
const ERR_INSTALL: &str = "Error installing module";
const ERR_START: &str = "Error starting module";

/// Module lists computed by the diff of a reload cycle.
#[derive(Default)]
struct Diff {
    removals: Vec<(ModuleLocation, ModuleId)>,
    installs: Vec<ModuleLocation>,
}

/// Drives a [`ModuleHost`] toward the declared module set.
///
/// Owns all reconciliation state and is meant to live on a single thread;
/// nothing in it is shared.
pub struct Reconciler {
    declaration_path: PathBuf,
    host: Arc<dyn ModuleHost>,
    bus: Bus,
    install_retry: InstallRetry,

    desired: Declaration,
    actual: BTreeMap<ModuleLocation, ModuleId>,
    start_attempted: HashSet<ModuleId>,
    last_loaded: Option<SystemTime>,
    unreadable_reported: bool,
}

impl Reconciler {
    /// Creates a reconciler and adopts the host's pre-installed modules.
    ///
    /// Only modules with a `file:` location are adopted; the system module
    /// ([`ModuleId::SYSTEM`]) never is.
    pub fn new(declaration_path: impl Into<PathBuf>, host: Arc<dyn ModuleHost>, bus: Bus) -> Self {
        let actual: BTreeMap<_, _> = host
            .modules()
            .into_iter()
            .filter(|m| m.id != ModuleId::SYSTEM && m.location.is_file_scheme())
            .map(|m| (m.location, m.id))
            .collect();
        bus.publish(Event::new(EventKind::ModulesAdopted).with_count(actual.len()));

        Self {
            declaration_path: declaration_path.into(),
            host,
            bus,
            install_retry: InstallRetry::default(),
            desired: Declaration::default(),
            actual,
            start_attempted: HashSet::new(),
            last_loaded: None,
            unreadable_reported: false,
        }
    }

    /// Sets when failed installs are retried.
    pub fn with_install_retry(mut self, retry: InstallRetry) -> Self {
        self.install_retry = retry;
        self
    }

    /// Path of the declaration file.
    pub fn declaration_path(&self) -> &Path {
        &self.declaration_path
    }

    /// Declaration currently used as the desired state.
    pub fn desired(&self) -> &Declaration {
        &self.desired
    }

    /// Id of the tracked module installed from `location`.
    pub fn installed(&self, location: &ModuleLocation) -> Option<ModuleId> {
        self.actual.get(location).copied()
    }

    /// Tracked modules, in location order.
    pub fn actual(&self) -> impl Iterator<Item = (&ModuleLocation, ModuleId)> {
        self.actual.iter().map(|(loc, id)| (loc, *id))
    }

    /// True if a start was already attempted for `id` in its current epoch.
    pub fn start_attempted(&self, id: ModuleId) -> bool {
        self.start_attempted.contains(&id)
    }

    /// Runs one reconciliation cycle and returns the failed operations.
    ///
    /// Never stops early: a failure on one module does not prevent work on
    /// any other module.
    pub fn synchronize(&mut self) -> Vec<OperationError> {
        let mut errors = Vec::new();

        let diff = if self.reload() {
            self.diff()
        } else if self.install_retry == InstallRetry::EveryCycle {
            Diff {
                removals: Vec::new(),
                installs: self.missing(),
            }
        } else {
            Diff::default()
        };

        self.update_pass(&mut errors);
        self.removal_pass(diff.removals, &mut errors);
        self.install_pass(diff.installs, &mut errors);
        self.resolve();
        self.start_pass(&mut errors);

        errors
    }

    /// Reloads the declaration if its modification time moved forward.
    ///
    /// Returns true when a new declaration was loaded.
    fn reload(&mut self) -> bool {
        let modified = match fs::metadata(&self.declaration_path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                self.report_unreadable(&e);
                return false;
            }
        };
        if self.last_loaded.is_some_and(|last| modified <= last) {
            self.unreadable_reported = false;
            return false;
        }

        match Declaration::load(&self.declaration_path) {
            Ok(declaration) => {
                self.desired = declaration;
                self.last_loaded = Some(modified);
                self.unreadable_reported = false;
                self.bus.publish(
                    Event::new(EventKind::DeclarationReloaded).with_count(self.desired.len()),
                );
                true
            }
            Err(e) => {
                self.report_unreadable(&e);
                false
            }
        }
    }

    fn report_unreadable(&mut self, err: &std::io::Error) {
        if self.unreadable_reported {
            return;
        }
        self.unreadable_reported = true;
        self.bus.publish(
            Event::new(EventKind::DeclarationUnreadable)
                .with_module(self.declaration_path.display().to_string())
                .with_reason(err.to_string()),
        );
    }

    /// Splits the current state against the desired set. Removed modules
    /// leave ActualSet immediately.
    fn diff(&mut self) -> Diff {
        let removed: Vec<ModuleLocation> = self
            .actual
            .keys()
            .filter(|loc| !self.desired.contains(loc))
            .cloned()
            .collect();

        let removals = removed
            .into_iter()
            .filter_map(|loc| self.actual.remove(&loc).map(|id| (loc, id)))
            .collect();

        Diff {
            removals,
            installs: self.missing(),
        }
    }

    fn missing(&self) -> Vec<ModuleLocation> {
        self.desired
            .locations()
            .filter(|loc| !self.actual.contains_key(*loc))
            .cloned()
            .collect()
    }

    fn update_pass(&mut self, errors: &mut Vec<OperationError>) {
        let tracked: Vec<(ModuleLocation, ModuleId)> =
            self.actual.iter().map(|(l, id)| (l.clone(), *id)).collect();

        for (location, id) in tracked {
            let artifact = location.artifact_path();
            let meta = match fs::metadata(&artifact) {
                Ok(meta) if meta.is_file() => meta,
                _ => {
                    self.actual.remove(&location);
                    self.start_attempted.remove(&id);
                    match self.host.uninstall(id) {
                        Ok(()) => self.bus.publish(
                            Event::new(EventKind::ModuleUninstalled)
                                .with_module(location.as_str())
                                .with_reason("artifact removed"),
                        ),
                        Err(e) => errors.push(OperationError::new(location, ERR_UNINSTALL, e)),
                    }
                    continue;
                }
            };

            let Ok(on_disk) = meta.modified() else {
                continue;
            };
            let Some(recorded) = self.host.snapshot(id).map(|s| s.last_modified) else {
                continue;
            };
            if on_disk <= recorded {
                continue;
            }

            let mut content = match File::open(&artifact) {
                Ok(file) => file,
                Err(e) => {
                    errors.push(OperationError::new(location, ERR_UPDATE_OPEN, HostError::Io(e)));
                    continue;
                }
            };
            match self.host.update(id, &mut content) {
                Ok(()) => {
                    self.start_attempted.remove(&id);
                    self.bus
                        .publish(Event::new(EventKind::ModuleUpdated).with_module(location.as_str()));
                }
                Err(e) => errors.push(OperationError::new(location, ERR_UPDATE, e)),
            }
        }
    }

    fn removal_pass(
        &mut self,
        removals: Vec<(ModuleLocation, ModuleId)>,
        errors: &mut Vec<OperationError>,
    ) {
        for (location, id) in removals {
            self.start_attempted.remove(&id);

            let uninstalled = self
                .host
                .snapshot(id)
                .is_some_and(|s| s.state == ModuleState::Uninstalled);
            if uninstalled {
                errors.push(OperationError::bare(location, ERR_ALREADY_UNINSTALLED));
                continue;
            }

            match self.host.uninstall(id) {
                Ok(()) => self.bus.publish(
                    Event::new(EventKind::ModuleUninstalled)
                        .with_module(location.as_str())
                        .with_reason("undeclared"),
                ),
                Err(HostError::AlreadyUninstalled { .. }) => {
                    errors.push(OperationError::bare(location, ERR_ALREADY_UNINSTALLED));
                }
                Err(e) => errors.push(OperationError::new(location, ERR_UNINSTALL, e)),
            }
        }
    }

    fn install_pass(&mut self, installs: Vec<ModuleLocation>, errors: &mut Vec<OperationError>) {
        for location in installs {
            match self.host.install(&location) {
                Ok(id) => {
                    self.start_attempted.remove(&id);
                    self.bus
                        .publish(Event::new(EventKind::ModuleInstalled).with_module(location.as_str()));
                    self.actual.insert(location, id);
                }
                Err(e) => errors.push(OperationError::new(location, ERR_INSTALL, e)),
            }
        }
    }

    fn resolve(&self) {
        match self.host.resolve_all() {
            Ok(()) => self.bus.publish(Event::new(EventKind::ModulesResolved)),
            Err(HostError::Unsupported) => {}
            Err(e) => self
                .bus
                .publish(Event::new(EventKind::ResolveFailed).with_reason(e.to_string())),
        }
    }

    fn start_pass(&mut self, errors: &mut Vec<OperationError>) {
        for (location, &id) in &self.actual {
            if self.start_attempted.contains(&id) {
                continue;
            }
            if self.host.snapshot(id).is_some_and(|s| s.fragment) {
                continue;
            }
            let policy = self.desired.policy_for(location);
            if !policy.starts() {
                continue;
            }

            self.start_attempted.insert(id);
            self.bus.publish(
                Event::new(EventKind::ModuleStarting)
                    .with_module(location.as_str())
                    .with_reason(policy.as_token()),
            );
            if let Err(e) = self.host.start(id, policy) {
                errors.push(OperationError::new(location.clone(), ERR_START, e));
            }
        }
    }
}
