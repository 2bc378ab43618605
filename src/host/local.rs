//! # LocalHost: a file-backed, in-process module host.
//!
//! The built-in `local` provider. It does not load code: it keeps a private
//! copy of every installed artifact in its storage directory and tracks the
//! lifecycle state of each module, which is enough to drive the launcher end
//! to end and to embed it where module semantics live elsewhere.
//!
//! ## Storage layout
//! ```text
//! <storage>/
//!   modules.index        id<TAB>location, one line per installed module
//!   modules/<id>.mod     private copy of the artifact
//! ```
//!
//! The index is rewritten after every install or uninstall, so a restarted
//! host reports earlier installs from [`ModuleHost::modules`] and the
//! launcher adopts them.
//!
//! ## State machine
//! ```text
//! install ──► Installed ──resolve_all──► Resolved ──start──► Active
//!                 ▲                                  └─(activationPolicy)─► Starting
//!                 └──────────────── update ◄──────────────────┘
//! any ── uninstall ──► Uninstalled (tombstone; a second uninstall fails)
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatch::DispatchHandle;
use crate::error::HostError;
use crate::host::{
    HostSettings, ModuleHost, ModuleId, ModuleLocation, ModuleSnapshot, ModuleState,
};
use crate::policies::StartPolicy;

const INDEX_FILE: &str = "modules.index";
const CONTENT_DIR: &str = "modules";
const SYSTEM_LOCATION: &str = "system:local";

struct Record {
    location: ModuleLocation,
    last_modified: SystemTime,
    state: ModuleState,
}

struct Inner {
    next_id: u64,
    records: BTreeMap<ModuleId, Record>,
    executors: HashMap<String, DispatchHandle>,
}

/// File-backed module host.
pub struct LocalHost {
    storage: PathBuf,
    started: SystemTime,
    inner: Mutex<Inner>,
    stopping: CancellationToken,
}

impl LocalHost {
    /// Opens (or creates) a host rooted at `settings.storage_dir`.
    ///
    /// Modules listed in an existing index whose stored copy is still present
    /// come back in state [`ModuleState::Installed`].
    pub fn open(settings: &HostSettings) -> Result<Arc<Self>, HostError> {
        let storage = settings.storage_dir.clone();
        fs::create_dir_all(storage.join(CONTENT_DIR))?;

        let records = load_index(&storage)?;
        let next_id = records.keys().next_back().map_or(1, |id| id.0 + 1);
        debug!(storage = %storage.display(), restored = records.len(), "local module host opened");

        Ok(Arc::new(Self {
            storage,
            started: SystemTime::now(),
            inner: Mutex::new(Inner {
                next_id,
                records,
                executors: HashMap::new(),
            }),
            stopping: CancellationToken::new(),
        }))
    }

    /// Executor registered under `thread`, if any.
    pub fn executor(&self, thread: &str) -> Option<DispatchHandle> {
        self.lock().executors.get(thread).cloned()
    }

    /// Directory this host stores its state in.
    pub fn storage_dir(&self) -> &Path {
        &self.storage
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn content_path(&self, id: ModuleId) -> PathBuf {
        content_path(&self.storage, id)
    }

    fn ensure_running(&self) -> Result<(), HostError> {
        if self.stopping.is_cancelled() {
            return Err(HostError::Stopping);
        }
        Ok(())
    }

    fn save_index(&self, inner: &Inner) -> Result<(), HostError> {
        let mut out = String::new();
        for (id, record) in &inner.records {
            if record.state != ModuleState::Uninstalled {
                out.push_str(&format!("{}\t{}\n", id.0, record.location));
            }
        }
        fs::write(self.storage.join(INDEX_FILE), out)?;
        Ok(())
    }

    fn system_snapshot(&self) -> ModuleSnapshot {
        ModuleSnapshot {
            id: ModuleId::SYSTEM,
            location: ModuleLocation::new(SYSTEM_LOCATION),
            last_modified: self.started,
            state: ModuleState::Active,
            fragment: false,
        }
    }
}

impl ModuleHost for LocalHost {
    fn modules(&self) -> Vec<ModuleSnapshot> {
        let inner = self.lock();
        let mut out = vec![self.system_snapshot()];
        out.extend(
            inner
                .records
                .iter()
                .filter(|(_, r)| r.state != ModuleState::Uninstalled)
                .map(|(id, r)| snapshot_of(*id, r)),
        );
        out
    }

    fn snapshot(&self, id: ModuleId) -> Option<ModuleSnapshot> {
        if id == ModuleId::SYSTEM {
            return Some(self.system_snapshot());
        }
        self.lock().records.get(&id).map(|r| snapshot_of(id, r))
    }

    fn install(&self, location: &ModuleLocation) -> Result<ModuleId, HostError> {
        self.ensure_running()?;
        let mut inner = self.lock();

        let existing = inner
            .records
            .iter()
            .find(|(_, r)| r.state != ModuleState::Uninstalled && &r.location == location)
            .map(|(id, _)| *id);
        if let Some(id) = existing {
            return Ok(id);
        }

        let source = location.artifact_path();
        if !source.is_file() {
            return Err(HostError::ArtifactMissing {
                location: location.clone(),
            });
        }

        let id = ModuleId(inner.next_id);
        fs::copy(&source, self.content_path(id))?;
        inner.next_id += 1;
        inner.records.insert(
            id,
            Record {
                location: location.clone(),
                last_modified: SystemTime::now(),
                state: ModuleState::Installed,
            },
        );
        self.save_index(&inner)?;
        Ok(id)
    }

    fn uninstall(&self, id: ModuleId) -> Result<(), HostError> {
        if id == ModuleId::SYSTEM {
            return Err(HostError::rejected("the system module cannot be uninstalled"));
        }
        let mut inner = self.lock();
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(HostError::UnknownModule { id })?;
        if record.state == ModuleState::Uninstalled {
            return Err(HostError::AlreadyUninstalled { id });
        }
        record.state = ModuleState::Uninstalled;

        match fs::remove_file(self.content_path(id)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        self.save_index(&inner)
    }

    fn update(&self, id: ModuleId, content: &mut dyn Read) -> Result<(), HostError> {
        self.ensure_running()?;
        let mut inner = self.lock();
        let record = live_record(&mut inner, id)?;

        let mut file = File::create(content_path(&self.storage, id))?;
        io::copy(content, &mut file)?;
        file.flush()?;

        record.last_modified = SystemTime::now();
        record.state = ModuleState::Installed;
        Ok(())
    }

    fn start(&self, id: ModuleId, policy: StartPolicy) -> Result<(), HostError> {
        if !policy.starts() {
            return Ok(());
        }
        self.ensure_running()?;
        let mut inner = self.lock();
        let record = live_record(&mut inner, id)?;
        record.state = if policy.uses_activation_policy() {
            ModuleState::Starting
        } else {
            ModuleState::Active
        };
        Ok(())
    }

    fn resolve_all(&self) -> Result<(), HostError> {
        let mut inner = self.lock();
        for record in inner.records.values_mut() {
            if record.state == ModuleState::Installed {
                record.state = ModuleState::Resolved;
            }
        }
        Ok(())
    }

    fn register_executor(&self, thread: &str, executor: DispatchHandle) {
        self.lock().executors.insert(thread.to_string(), executor);
    }

    fn shutdown(&self) -> Result<(), HostError> {
        self.lock().executors.clear();
        self.stopping.cancel();
        Ok(())
    }

    fn stopping(&self) -> CancellationToken {
        self.stopping.clone()
    }
}

fn content_path(storage: &Path, id: ModuleId) -> PathBuf {
    storage.join(CONTENT_DIR).join(format!("{}.mod", id.0))
}

fn snapshot_of(id: ModuleId, record: &Record) -> ModuleSnapshot {
    ModuleSnapshot {
        id,
        location: record.location.clone(),
        last_modified: record.last_modified,
        state: record.state,
        fragment: false,
    }
}

fn live_record(inner: &mut Inner, id: ModuleId) -> Result<&mut Record, HostError> {
    match inner.records.get_mut(&id) {
        None => Err(HostError::UnknownModule { id }),
        Some(r) if r.state == ModuleState::Uninstalled => Err(HostError::AlreadyUninstalled { id }),
        Some(r) => Ok(r),
    }
}

fn load_index(storage: &Path) -> Result<BTreeMap<ModuleId, Record>, HostError> {
    let text = match fs::read_to_string(storage.join(INDEX_FILE)) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = BTreeMap::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let Some((raw_id, location)) = line.split_once('\t') else {
            warn!(line, "skipping malformed module index entry");
            continue;
        };
        let Ok(raw_id) = raw_id.trim().parse::<u64>() else {
            warn!(line, "skipping module index entry with a bad id");
            continue;
        };
        let id = ModuleId(raw_id);
        let Ok(meta) = fs::metadata(content_path(storage, id)) else {
            warn!(%id, location, "stored module content is gone; forgetting it");
            continue;
        };
        records.insert(
            id,
            Record {
                location: ModuleLocation::new(location),
                last_modified: meta.modified()?,
                state: ModuleState::Installed,
            },
        );
    }
    Ok(records)
}
