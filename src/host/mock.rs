//! Scriptable in-memory host for unit tests.
//!
//! Records every primitive call in order, fails chosen operations on chosen
//! locations, and reports chosen locations as fragments.

use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;

use crate::dispatch::DispatchHandle;
use crate::error::HostError;
use crate::host::{ModuleHost, ModuleId, ModuleLocation, ModuleSnapshot, ModuleState};
use crate::policies::StartPolicy;

/// One recorded host call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Op {
    Install(ModuleLocation),
    Uninstall(ModuleLocation),
    Update(ModuleLocation),
    Start(ModuleLocation, StartPolicy),
    Resolve,
    Shutdown,
}

/// Operation selector for failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum OpKind {
    Install,
    Uninstall,
    Update,
    Start,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resolve {
    Ok,
    Unsupported,
    Fails,
}

struct Rec {
    location: ModuleLocation,
    last_modified: SystemTime,
    state: ModuleState,
    content: Vec<u8>,
}

struct State {
    next_id: u64,
    records: BTreeMap<ModuleId, Rec>,
    log: Vec<Op>,
    failures: HashSet<(OpKind, ModuleLocation)>,
    fragments: HashSet<ModuleLocation>,
    resolve: Resolve,
    shutdown_fails: bool,
    executors: Vec<(String, DispatchHandle)>,
}

pub(crate) struct MockHost {
    state: Mutex<State>,
    stopping: CancellationToken,
}

impl MockHost {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                next_id: 1,
                records: BTreeMap::new(),
                log: Vec::new(),
                failures: HashSet::new(),
                fragments: HashSet::new(),
                resolve: Resolve::Ok,
                shutdown_fails: false,
                executors: Vec::new(),
            }),
            stopping: CancellationToken::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn fail(&self, kind: OpKind, location: &ModuleLocation) {
        self.lock().failures.insert((kind, location.clone()));
    }

    pub(crate) fn heal(&self, kind: OpKind, location: &ModuleLocation) {
        self.lock().failures.remove(&(kind, location.clone()));
    }

    pub(crate) fn mark_fragment(&self, location: &ModuleLocation) {
        self.lock().fragments.insert(location.clone());
    }

    pub(crate) fn set_resolve(&self, mode: Resolve) {
        self.lock().resolve = mode;
    }

    pub(crate) fn fail_shutdown(&self) {
        self.lock().shutdown_fails = true;
    }

    /// Adds a module as if it had been installed before the launcher started.
    pub(crate) fn preinstall(&self, id: ModuleId, location: &ModuleLocation) {
        let mut st = self.lock();
        st.next_id = st.next_id.max(id.0 + 1);
        st.records.insert(
            id,
            Rec {
                location: location.clone(),
                last_modified: SystemTime::now(),
                state: ModuleState::Installed,
                content: Vec::new(),
            },
        );
    }

    /// Uninstalls behind the launcher's back, without logging.
    pub(crate) fn uninstall_externally(&self, id: ModuleId) {
        if let Some(rec) = self.lock().records.get_mut(&id) {
            rec.state = ModuleState::Uninstalled;
        }
    }

    pub(crate) fn ops(&self) -> Vec<Op> {
        self.lock().log.clone()
    }

    pub(crate) fn clear_ops(&self) {
        self.lock().log.clear();
    }

    /// Number of `start` calls for `location` since the last `clear_ops`.
    pub(crate) fn starts_of(&self, location: &ModuleLocation) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|op| matches!(op, Op::Start(l, _) if l == location))
            .count()
    }

    /// Id of the live module installed from `location`.
    pub(crate) fn id_of(&self, location: &ModuleLocation) -> Option<ModuleId> {
        self.lock()
            .records
            .iter()
            .find(|(_, r)| r.state != ModuleState::Uninstalled && &r.location == location)
            .map(|(id, _)| *id)
    }

    pub(crate) fn content_of(&self, id: ModuleId) -> Vec<u8> {
        self.lock()
            .records
            .get(&id)
            .map(|r| r.content.clone())
            .unwrap_or_default()
    }

    pub(crate) fn executor_names(&self) -> Vec<String> {
        self.lock().executors.iter().map(|(n, _)| n.clone()).collect()
    }
}

fn injected(st: &State, kind: OpKind, location: &ModuleLocation) -> Result<(), HostError> {
    if st.failures.contains(&(kind, location.clone())) {
        return Err(HostError::rejected(format!("injected {kind:?} failure")));
    }
    Ok(())
}

impl ModuleHost for MockHost {
    fn modules(&self) -> Vec<ModuleSnapshot> {
        let st = self.lock();
        st.records
            .iter()
            .filter(|(_, r)| r.state != ModuleState::Uninstalled)
            .map(|(id, r)| ModuleSnapshot {
                id: *id,
                location: r.location.clone(),
                last_modified: r.last_modified,
                state: r.state,
                fragment: st.fragments.contains(&r.location),
            })
            .collect()
    }

    fn snapshot(&self, id: ModuleId) -> Option<ModuleSnapshot> {
        let st = self.lock();
        st.records.get(&id).map(|r| ModuleSnapshot {
            id,
            location: r.location.clone(),
            last_modified: r.last_modified,
            state: r.state,
            fragment: st.fragments.contains(&r.location),
        })
    }

    fn install(&self, location: &ModuleLocation) -> Result<ModuleId, HostError> {
        let mut st = self.lock();
        st.log.push(Op::Install(location.clone()));
        injected(&st, OpKind::Install, location)?;

        let id = ModuleId(st.next_id);
        st.next_id += 1;
        st.records.insert(
            id,
            Rec {
                location: location.clone(),
                last_modified: SystemTime::now(),
                state: ModuleState::Installed,
                content: Vec::new(),
            },
        );
        Ok(id)
    }

    fn uninstall(&self, id: ModuleId) -> Result<(), HostError> {
        let mut st = self.lock();
        let location = st
            .records
            .get(&id)
            .map(|r| r.location.clone())
            .ok_or(HostError::UnknownModule { id })?;
        st.log.push(Op::Uninstall(location.clone()));
        injected(&st, OpKind::Uninstall, &location)?;

        let rec = st
            .records
            .get_mut(&id)
            .ok_or(HostError::UnknownModule { id })?;
        if rec.state == ModuleState::Uninstalled {
            return Err(HostError::AlreadyUninstalled { id });
        }
        rec.state = ModuleState::Uninstalled;
        Ok(())
    }

    fn update(&self, id: ModuleId, content: &mut dyn Read) -> Result<(), HostError> {
        let mut st = self.lock();
        let location = st
            .records
            .get(&id)
            .map(|r| r.location.clone())
            .ok_or(HostError::UnknownModule { id })?;
        st.log.push(Op::Update(location.clone()));
        injected(&st, OpKind::Update, &location)?;

        let mut body = Vec::new();
        content.read_to_end(&mut body)?;
        let rec = st
            .records
            .get_mut(&id)
            .ok_or(HostError::UnknownModule { id })?;
        rec.content = body;
        rec.last_modified = SystemTime::now();
        rec.state = ModuleState::Installed;
        Ok(())
    }

    fn start(&self, id: ModuleId, policy: StartPolicy) -> Result<(), HostError> {
        let mut st = self.lock();
        let location = st
            .records
            .get(&id)
            .map(|r| r.location.clone())
            .ok_or(HostError::UnknownModule { id })?;
        st.log.push(Op::Start(location.clone(), policy));
        injected(&st, OpKind::Start, &location)?;
        if st.fragments.contains(&location) {
            return Err(HostError::rejected("fragments cannot be started"));
        }

        if let Some(rec) = st.records.get_mut(&id) {
            rec.state = ModuleState::Active;
        }
        Ok(())
    }

    fn resolve_all(&self) -> Result<(), HostError> {
        let mut st = self.lock();
        st.log.push(Op::Resolve);
        match st.resolve {
            Resolve::Ok => Ok(()),
            Resolve::Unsupported => Err(HostError::Unsupported),
            Resolve::Fails => Err(HostError::rejected("unresolved requirement")),
        }
    }

    fn register_executor(&self, thread: &str, executor: DispatchHandle) {
        self.lock().executors.push((thread.to_string(), executor));
    }

    fn shutdown(&self) -> Result<(), HostError> {
        let mut st = self.lock();
        st.log.push(Op::Shutdown);
        if st.shutdown_fails {
            return Err(HostError::rejected("refusing to stop"));
        }
        self.stopping.cancel();
        Ok(())
    }

    fn stopping(&self) -> CancellationToken {
        self.stopping.clone()
    }
}
