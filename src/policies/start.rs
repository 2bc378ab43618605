//! # Start policies for managed modules.
//!
//! [`StartPolicy`] tells the host how (and whether) a module is started once it
//! is installed. Each declaration entry may carry its own policy
//! (`path;start=<token>`); otherwise the declaration-wide default applies.
//!
//! | token                        | policy                                   |
//! |------------------------------|------------------------------------------|
//! | `none`                       | [`StartPolicy::NoStart`]                 |
//! | `start`                      | [`StartPolicy::Start`]                   |
//! | `transient`                  | [`StartPolicy::StartTransient`]          |
//! | `activationPolicy`           | [`StartPolicy::StartWithActivationPolicy`] |
//! | `transient+activationPolicy` | [`StartPolicy::StartTransientWithActivationPolicy`] |
//!
//! Unknown tokens never fail: callers fall back to their default.

use std::fmt;

/// How a module is started by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum StartPolicy {
    /// Leave the module installed but stopped.
    NoStart,
    /// Start persistently (default).
    #[default]
    Start,
    /// Start without recording the start persistently.
    StartTransient,
    /// Start honoring the module's declared (lazy) activation policy.
    StartWithActivationPolicy,
    /// Transient start honoring the declared activation policy.
    StartTransientWithActivationPolicy,
}

impl StartPolicy {
    /// Parses a declaration token; `None` for unknown tokens.
    ///
    /// # Example
    /// ```
    /// use modvisor::StartPolicy;
    ///
    /// assert_eq!(StartPolicy::parse("none"), Some(StartPolicy::NoStart));
    /// assert_eq!(StartPolicy::parse("bogus"), None);
    /// ```
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "none" => Some(StartPolicy::NoStart),
            "start" => Some(StartPolicy::Start),
            "transient" => Some(StartPolicy::StartTransient),
            "activationPolicy" => Some(StartPolicy::StartWithActivationPolicy),
            "transient+activationPolicy" => Some(StartPolicy::StartTransientWithActivationPolicy),
            _ => None,
        }
    }

    /// Parses `token`, falling back to `default` when absent or unknown.
    pub fn parse_or(token: Option<&str>, default: StartPolicy) -> Self {
        token.and_then(Self::parse).unwrap_or(default)
    }

    /// Declaration token for this policy.
    pub fn as_token(&self) -> &'static str {
        match self {
            StartPolicy::NoStart => "none",
            StartPolicy::Start => "start",
            StartPolicy::StartTransient => "transient",
            StartPolicy::StartWithActivationPolicy => "activationPolicy",
            StartPolicy::StartTransientWithActivationPolicy => "transient+activationPolicy",
        }
    }

    /// True unless the policy is [`StartPolicy::NoStart`].
    #[inline]
    pub fn starts(&self) -> bool {
        !matches!(self, StartPolicy::NoStart)
    }

    /// True for the transient variants.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StartPolicy::StartTransient | StartPolicy::StartTransientWithActivationPolicy
        )
    }

    /// True for the variants that honor the module's activation policy.
    #[inline]
    pub fn uses_activation_policy(&self) -> bool {
        matches!(
            self,
            StartPolicy::StartWithActivationPolicy
                | StartPolicy::StartTransientWithActivationPolicy
        )
    }
}

impl fmt::Display for StartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_token_parses_back() {
        for policy in [
            StartPolicy::NoStart,
            StartPolicy::Start,
            StartPolicy::StartTransient,
            StartPolicy::StartWithActivationPolicy,
            StartPolicy::StartTransientWithActivationPolicy,
        ] {
            assert_eq!(StartPolicy::parse(policy.as_token()), Some(policy));
        }
    }

    #[test]
    fn unknown_token_falls_back_to_default() {
        assert_eq!(
            StartPolicy::parse_or(Some("eager"), StartPolicy::StartTransient),
            StartPolicy::StartTransient
        );
        assert_eq!(
            StartPolicy::parse_or(None, StartPolicy::NoStart),
            StartPolicy::NoStart
        );
    }

    #[test]
    fn tokens_are_case_sensitive() {
        assert_eq!(StartPolicy::parse("None"), None);
        assert_eq!(StartPolicy::parse("activationpolicy"), None);
    }

    #[test]
    fn transient_activation_policy_flags() {
        let p = StartPolicy::StartTransientWithActivationPolicy;
        assert!(p.starts());
        assert!(p.is_transient());
        assert!(p.uses_activation_policy());
        assert!(!StartPolicy::NoStart.starts());
    }
}
