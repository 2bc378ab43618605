//! # Desired-state declaration.
//!
//! Turns the launch properties into a [`Declaration`]: the set of module
//! locations that should be installed, each with its [`StartPolicy`].
//!
//! ## Format
//! ```text
//! modvisor.defaultStart = start
//! modvisor.runModules   = /mods/a.jar;start=none, /mods/b.jar, /mods/c.jar;start=transient
//! ```
//!
//! - entries are comma separated and trimmed; blank entries are skipped;
//! - each entry is `path[;start=<token>]`, the path becomes `file:<path>`;
//! - an unknown `start=` token (or default token) falls back to the default,
//!   it never fails the load.

mod properties;

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::core::keys;
use crate::host::ModuleLocation;
use crate::policies::StartPolicy;

pub use properties::Properties;

const START_OPTION: &str = "start=";

/// Desired modules and their start policies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Declaration {
    modules: BTreeMap<ModuleLocation, StartPolicy>,
    default_start: StartPolicy,
}

impl Declaration {
    /// Reads and parses the declaration file.
    pub fn load(path: &Path) -> io::Result<Self> {
        Properties::load(path).map(|props| Self::from_properties(&props))
    }

    /// Builds the declaration from already parsed properties.
    pub fn from_properties(props: &Properties) -> Self {
        let default_start =
            StartPolicy::parse_or(props.get(keys::DEFAULT_START), StartPolicy::default());

        let mut modules = BTreeMap::new();
        if let Some(list) = props.get(keys::RUN_MODULES) {
            for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let mut parts = entry.split(';');
                let path = parts.next().unwrap_or_default().trim();
                if path.is_empty() {
                    continue;
                }

                let mut policy = default_start;
                for option in parts.map(str::trim) {
                    if let Some(token) = option.strip_prefix(START_OPTION) {
                        policy = StartPolicy::parse_or(Some(token), default_start);
                    }
                }
                modules.insert(ModuleLocation::from_path(path), policy);
            }
        }

        Self {
            modules,
            default_start,
        }
    }

    /// Default start policy of this declaration.
    pub fn default_start(&self) -> StartPolicy {
        self.default_start
    }

    /// Start policy for `location`: its own override, else the default.
    pub fn policy_for(&self, location: &ModuleLocation) -> StartPolicy {
        self.modules
            .get(location)
            .copied()
            .unwrap_or(self.default_start)
    }

    /// True if `location` is desired.
    pub fn contains(&self, location: &ModuleLocation) -> bool {
        self.modules.contains_key(location)
    }

    /// Desired locations in key order.
    pub fn locations(&self) -> impl Iterator<Item = &ModuleLocation> {
        self.modules.keys()
    }

    /// Number of desired modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True if no module is desired.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(text: &str) -> Declaration {
        Declaration::from_properties(&Properties::parse(text))
    }

    #[test]
    fn entries_get_scheme_and_default_policy() {
        let d = decl("modvisor.runModules = /mods/a.jar, /mods/b.jar\n");
        assert_eq!(d.len(), 2);
        assert_eq!(d.default_start(), StartPolicy::Start);
        assert_eq!(
            d.policy_for(&ModuleLocation::new("file:/mods/a.jar")),
            StartPolicy::Start
        );
    }

    #[test]
    fn per_entry_override_beats_default() {
        let d = decl(
            "modvisor.defaultStart = transient\n\
             modvisor.runModules = /a.jar;start=none, /b.jar\n",
        );
        assert_eq!(
            d.policy_for(&ModuleLocation::from_path("/a.jar")),
            StartPolicy::NoStart
        );
        assert_eq!(
            d.policy_for(&ModuleLocation::from_path("/b.jar")),
            StartPolicy::StartTransient
        );
    }

    #[test]
    fn malformed_tokens_fall_back_to_default() {
        let d = decl(
            "modvisor.defaultStart = eventually\n\
             modvisor.runModules = /a.jar;start=whenever, /b.jar;start=\n",
        );
        assert_eq!(d.default_start(), StartPolicy::Start);
        assert_eq!(
            d.policy_for(&ModuleLocation::from_path("/a.jar")),
            StartPolicy::Start
        );
        assert_eq!(
            d.policy_for(&ModuleLocation::from_path("/b.jar")),
            StartPolicy::Start
        );
    }

    #[test]
    fn blank_entries_are_skipped() {
        let d = decl("modvisor.runModules = , /a.jar,  ,, ;start=none ,\n");
        assert_eq!(
            d.locations().collect::<Vec<_>>(),
            vec![&ModuleLocation::from_path("/a.jar")]
        );
    }

    #[test]
    fn unrelated_options_are_ignored() {
        let d = decl("modvisor.runModules = /a.jar;version=1.0;start=activationPolicy\n");
        assert_eq!(
            d.policy_for(&ModuleLocation::from_path("/a.jar")),
            StartPolicy::StartWithActivationPolicy
        );
    }

    #[test]
    fn missing_module_list_is_empty() {
        let d = decl("modvisor.defaultStart = none\n");
        assert!(d.is_empty());
        assert_eq!(d.default_start(), StartPolicy::NoStart);
    }

    #[test]
    fn undesired_location_uses_default() {
        let d = decl("modvisor.defaultStart = transient\n");
        assert_eq!(
            d.policy_for(&ModuleLocation::from_path("/other.jar")),
            StartPolicy::StartTransient
        );
    }
}
