use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scope::{InvalidScopeToken, Scope, ScopeToken, ScopeTokenRef};

/// Indicates the requester held insufficient scope to be granted access
/// to a controlled resource
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Error)]
#[error("insufficient scope")]
pub struct InsufficientScope;

/// How required scopes are matched against a caller's granted scopes
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// At least one required scope must have been granted
    #[default]
    Any,
    /// Every required scope must have been granted
    All,
}

/// An access policy over a caller's granted scopes
///
/// A policy pairs an ordered list of required scope tokens with a
/// [`MatchMode`]. A policy with no required tokens is unrestricted and
/// allows every request.
///
/// The required tokens keep their configuration order, which is the order
/// they are rendered in challenge responses. Duplicates are tolerated;
/// matching is set-semantic.
///
/// # Examples
///
/// ## Require any of the listed scopes
/// ```
/// use permeso::ScopePolicy;
///
/// let policy = ScopePolicy::any_of_static("read write");
///
/// let granted = "read".parse()?;
/// assert!(policy.evaluate(&granted).is_ok());
/// # Ok::<_, permeso::InvalidScopeToken>(())
/// ```
///
/// ## Require all of the listed scopes
/// ```
/// use permeso::ScopePolicy;
///
/// let policy = ScopePolicy::all_of_static("read write");
///
/// let granted = "read".parse()?;
/// assert!(policy.evaluate(&granted).is_err());
///
/// let granted = "read write admin".parse()?;
/// assert!(policy.evaluate(&granted).is_ok());
/// # Ok::<_, permeso::InvalidScopeToken>(())
/// ```
///
/// ## No restriction
/// ```
/// use permeso::{Scope, ScopePolicy};
///
/// let policy = ScopePolicy::unrestricted();
/// assert!(policy.evaluate(&Scope::empty()).is_ok());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct ScopePolicy {
    required: Vec<ScopeToken>,
    mode: MatchMode,
}

impl ScopePolicy {
    /// Constructs a policy that requires no scopes and allows every request
    #[inline]
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Constructs a policy satisfied by at least one of the given tokens
    pub fn any_of<I>(required: I) -> Self
    where
        I: IntoIterator<Item = ScopeToken>,
    {
        Self {
            required: required.into_iter().collect(),
            mode: MatchMode::Any,
        }
    }

    /// Constructs a policy satisfied only by all of the given tokens
    pub fn all_of<I>(required: I) -> Self
    where
        I: IntoIterator<Item = ScopeToken>,
    {
        Self {
            required: required.into_iter().collect(),
            mode: MatchMode::All,
        }
    }

    /// Constructs an any-of policy from a whitespace-delimited string
    pub fn any_of_str(required: &str) -> Result<Self, InvalidScopeToken> {
        Ok(Self::any_of(parse_required(required)?))
    }

    /// Constructs an all-of policy from a whitespace-delimited string
    pub fn all_of_str(required: &str) -> Result<Self, InvalidScopeToken> {
        Ok(Self::all_of(parse_required(required)?))
    }

    /// Constructs an any-of policy from a static string
    ///
    /// # Panics
    ///
    /// This function will panic if the provided string contains an invalid
    /// scope token.
    pub fn any_of_static(required: &'static str) -> Self {
        match Self::any_of_str(required) {
            Ok(policy) => policy,
            Err(err) => panic!("{}: required scopes = {}", err, required),
        }
    }

    /// Constructs an all-of policy from a static string
    ///
    /// # Panics
    ///
    /// This function will panic if the provided string contains an invalid
    /// scope token.
    pub fn all_of_static(required: &'static str) -> Self {
        match Self::all_of_str(required) {
            Ok(policy) => policy,
            Err(err) => panic!("{}: required scopes = {}", err, required),
        }
    }

    /// Whether this policy requires no scopes at all
    #[inline]
    pub fn is_unrestricted(&self) -> bool {
        self.required.is_empty()
    }

    /// The configured match mode
    #[inline]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// The required scope tokens, in configuration order
    #[inline]
    pub fn required(&self) -> impl Iterator<Item = &ScopeTokenRef> {
        self.required.iter().map(|t| t.as_ref())
    }

    /// Evaluates a caller's granted scopes against this policy
    ///
    /// An unrestricted policy accepts any granted set, including an empty
    /// one.
    pub fn evaluate(&self, granted: &Scope) -> Result<(), InsufficientScope> {
        if self.is_unrestricted() {
            return Ok(());
        }

        let satisfied = match self.mode {
            MatchMode::Any => self.required.iter().any(|t| granted.contains(t.as_ref())),
            MatchMode::All => self.required.iter().all(|t| granted.contains(t.as_ref())),
        };

        if satisfied {
            Ok(())
        } else {
            Err(InsufficientScope)
        }
    }
}

fn parse_required(s: &str) -> Result<Vec<ScopeToken>, InvalidScopeToken> {
    s.split_whitespace()
        .map(|s| ScopeToken::new(s.to_string()))
        .collect()
}

/// Renders the required tokens, space-delimited, in configuration order
impl fmt::Display for ScopePolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut tokens = self.required.iter();
        if let Some(first) = tokens.next() {
            f.write_str(first.as_str())?;
            for token in tokens {
                f.write_str(" ")?;
                f.write_str(token.as_str())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_accepts_single_matching_grant() {
        let policy = ScopePolicy::any_of_static("read write");
        assert!(policy.evaluate(&"read".parse().unwrap()).is_ok());
    }

    #[test]
    fn any_rejects_disjoint_grant() {
        let policy = ScopePolicy::any_of_static("read write");
        assert_eq!(
            policy.evaluate(&"admin".parse().unwrap()),
            Err(InsufficientScope)
        );
    }

    #[test]
    fn all_rejects_partial_grant() {
        let policy = ScopePolicy::all_of_static("read write");
        assert_eq!(
            policy.evaluate(&"read".parse().unwrap()),
            Err(InsufficientScope)
        );
    }

    #[test]
    fn all_accepts_superset_grant() {
        let policy = ScopePolicy::all_of_static("read write");
        assert!(policy.evaluate(&"read write admin".parse().unwrap()).is_ok());
    }

    #[test]
    fn unrestricted_accepts_empty_grant() {
        let policy = ScopePolicy::unrestricted();
        assert!(policy.evaluate(&Scope::empty()).is_ok());
    }

    #[test]
    fn empty_string_produces_unrestricted_policy() {
        let policy = ScopePolicy::any_of_str("").unwrap();
        assert!(policy.is_unrestricted());
    }

    #[test]
    fn duplicate_required_tokens_do_not_affect_matching() {
        let policy = ScopePolicy::all_of_static("read read write");
        assert!(policy.evaluate(&"write read".parse().unwrap()).is_ok());
    }

    #[test]
    fn display_preserves_configuration_order() {
        let policy = ScopePolicy::all_of_static("write read admin");
        assert_eq!(policy.to_string(), "write read admin");
    }

    #[test]
    fn default_mode_is_any() {
        assert_eq!(MatchMode::default(), MatchMode::Any);
    }

    #[test]
    #[should_panic(expected = "invalid scope token")]
    fn static_constructor_panics_on_invalid_token() {
        let _ = ScopePolicy::any_of_static("re\"ad");
    }
}
