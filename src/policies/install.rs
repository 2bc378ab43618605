//! # Install retry policy.
//!
//! Decides when a failed install is attempted again.
//!
//! ```text
//! InstallRetry::OnReload    → only after the declaration file changes and still lists it
//! InstallRetry::EveryCycle  → every cycle while the location stays desired
//! ```

/// When a failed install is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum InstallRetry {
    /// Retry only after a reload that still desires the location (default).
    #[default]
    OnReload,
    /// Retry on every cycle, reload or not.
    EveryCycle,
}

impl InstallRetry {
    /// Parses the `installRetry` property value (`reload` | `cycle`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "reload" => Some(InstallRetry::OnReload),
            "cycle" => Some(InstallRetry::EveryCycle),
            _ => None,
        }
    }
}
