use serde::{Deserialize, Serialize};

use crate::policy::ScopePolicy;
use crate::principal::Principal;

/// The attribute a guard reads granted scopes from unless configured
/// otherwise
pub const DEFAULT_SCOPE_ATTRIBUTE: &str = "scope";

const INSUFFICIENT_SCOPE: &str = "Insufficient scope";

/// How a guard delivers a denial
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialMode {
    /// The guard's embedder writes the 403 challenge response itself
    #[default]
    DirectResponse,
    /// The denial is handed to the next error-handling stage as a
    /// [`ForwardedError`] descriptor
    Forward,
}

/// A reusable request-authorization decision function
///
/// A guard closes over an immutable configuration: the scope policy, the
/// name of the principal attribute holding granted scopes, and the denial
/// delivery mode. Invocations are independent and share no mutable state,
/// so one guard may serve concurrent requests.
///
/// ```
/// use permeso::{Decision, DenialMode, Guard, Principal, ScopePolicy};
///
/// let guard = Guard::new(ScopePolicy::any_of_static("read write"))
///     .with_scope_attribute("permissions")
///     .with_denial_mode(DenialMode::Forward);
///
/// let caller = Principal::new().with_attribute("permissions", "read");
/// assert!(matches!(guard.decide(Some(&caller)), Decision::Allow));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Guard {
    policy: ScopePolicy,
    scope_attribute: String,
    denial_mode: DenialMode,
}

impl Guard {
    /// Constructs a guard enforcing the given policy
    ///
    /// The guard reads granted scopes from the
    /// [`DEFAULT_SCOPE_ATTRIBUTE`] and delivers denials as
    /// [`DenialMode::DirectResponse`] until configured otherwise.
    pub fn new(policy: ScopePolicy) -> Self {
        Self {
            policy,
            scope_attribute: DEFAULT_SCOPE_ATTRIBUTE.to_owned(),
            denial_mode: DenialMode::default(),
        }
    }

    /// Reads granted scopes from a differently named principal attribute
    pub fn with_scope_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.scope_attribute = attribute.into();
        self
    }

    /// Changes how denials are delivered
    pub fn with_denial_mode(mut self, mode: DenialMode) -> Self {
        self.denial_mode = mode;
        self
    }

    /// The policy this guard enforces
    #[inline]
    pub fn policy(&self) -> &ScopePolicy {
        &self.policy
    }

    /// The principal attribute granted scopes are read from
    #[inline]
    pub fn scope_attribute(&self) -> &str {
        &self.scope_attribute
    }

    /// The configured denial delivery mode
    #[inline]
    pub fn denial_mode(&self) -> DenialMode {
        self.denial_mode
    }

    /// Decides whether the request carrying `principal` may proceed
    ///
    /// An unrestricted policy allows the request without consulting the
    /// principal. Otherwise a missing principal denies outright, and a
    /// present principal has its granted scopes read from the configured
    /// attribute (absent attribute meaning no grants) and evaluated
    /// against the policy. No denial is ever raised as an error from this
    /// method.
    pub fn decide(&self, principal: Option<&Principal>) -> Decision {
        if self.policy.is_unrestricted() {
            return Decision::Allow;
        }

        let Some(principal) = principal else {
            tracing::debug!("no principal attached to the request");
            return Decision::Deny(self.denial());
        };

        let granted = principal.granted_scopes(&self.scope_attribute);
        tracing::trace!(?granted, policy = %self.policy, "evaluating scope policy");

        match self.policy.evaluate(&granted) {
            Ok(()) => Decision::Allow,
            Err(_) => Decision::Deny(self.denial()),
        }
    }

    fn denial(&self) -> Denial {
        Denial {
            message: INSUFFICIENT_SCOPE,
            scope: self.policy.to_string(),
            delivery: self.denial_mode,
        }
    }
}

/// The outcome of a guard invocation
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum Decision {
    /// The request may proceed to the protected handler
    Allow,
    /// The request is denied
    Deny(Denial),
}

impl Decision {
    /// Whether the request may proceed
    #[inline]
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// The shape of a denied request's response
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Denial {
    message: &'static str,
    scope: String,
    delivery: DenialMode,
}

impl Denial {
    /// The denial message presented to the caller
    #[inline]
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// The required scopes, space-delimited in configuration order
    #[inline]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// How this denial is to be delivered
    #[inline]
    pub fn delivery(&self) -> DenialMode {
        self.delivery
    }

    /// Renders the RFC 6750 bearer challenge for this denial
    ///
    /// The value is always a valid header value: scope tokens exclude the
    /// bytes that would need escaping inside a quoted parameter, and the
    /// message is fixed.
    pub fn www_authenticate(&self) -> String {
        format!(
            r#"Bearer scope="{}", error="{}""#,
            self.scope, self.message
        )
    }

    /// Converts this denial into the descriptor handed to the next
    /// error-handling stage
    pub fn into_forwarded(self) -> ForwardedError {
        ForwardedError {
            status_code: 403,
            error: "Forbidden".to_owned(),
            message: self.message.to_owned(),
        }
    }
}

/// A structured error descriptor passed to the next error-handling stage
/// when a guard denies in [`DenialMode::Forward`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedError {
    /// The HTTP status the final response should carry
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// The reason phrase for the status
    pub error: String,
    /// The denial message
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::MatchMode;

    fn caller(scopes: &str) -> Principal {
        Principal::new().with_attribute("scope", scopes)
    }

    #[test]
    fn unrestricted_guard_allows_without_principal() {
        let guard = Guard::new(ScopePolicy::unrestricted());
        assert!(guard.decide(None).is_allow());
        assert!(guard.decide(Some(&Principal::new())).is_allow());
    }

    #[test]
    fn missing_principal_denies() {
        let guard = Guard::new(ScopePolicy::any_of_static("read"));
        assert!(matches!(guard.decide(None), Decision::Deny(_)));
    }

    #[test]
    fn principal_without_scope_attribute_denies() {
        let guard = Guard::new(ScopePolicy::any_of_static("read"));
        let principal = Principal::new().with_subject("user@example.com");
        assert!(matches!(guard.decide(Some(&principal)), Decision::Deny(_)));
    }

    #[test]
    fn any_policy_allows_partial_grant() {
        let guard = Guard::new(ScopePolicy::any_of_static("read write"));
        assert!(guard.decide(Some(&caller("read"))).is_allow());
    }

    #[test]
    fn all_policy_denies_partial_grant() {
        let guard = Guard::new(ScopePolicy::all_of_static("read write"));
        assert!(matches!(
            guard.decide(Some(&caller("read"))),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn all_policy_allows_superset_grant() {
        let guard = Guard::new(ScopePolicy::all_of_static("read write"));
        assert!(guard.decide(Some(&caller("read write admin"))).is_allow());
    }

    #[test]
    fn custom_scope_attribute_is_honored() {
        let guard = Guard::new(ScopePolicy::any_of_static("read"))
            .with_scope_attribute("permissions");

        let principal = Principal::new().with_attribute("permissions", "read");
        assert!(guard.decide(Some(&principal)).is_allow());

        // a grant under the default attribute no longer counts
        assert!(matches!(
            guard.decide(Some(&caller("read"))),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn denial_carries_message_and_joined_scopes() {
        let guard = Guard::new(ScopePolicy::all_of_static("read write"));
        let Decision::Deny(denial) = guard.decide(None) else {
            panic!("expected denial");
        };
        assert_eq!(denial.message(), "Insufficient scope");
        assert_eq!(denial.scope(), "read write");
        assert_eq!(denial.delivery(), DenialMode::DirectResponse);
    }

    #[test]
    fn denial_renders_rfc6750_challenge() {
        let guard = Guard::new(ScopePolicy::any_of_static("read"));
        let Decision::Deny(denial) = guard.decide(None) else {
            panic!("expected denial");
        };
        assert_eq!(
            denial.www_authenticate(),
            r#"Bearer scope="read", error="Insufficient scope""#
        );
    }

    #[test]
    fn forwarded_descriptor_matches_wire_shape() {
        let guard = Guard::new(ScopePolicy::any_of_static("read"))
            .with_denial_mode(DenialMode::Forward);
        let Decision::Deny(denial) = guard.decide(None) else {
            panic!("expected denial");
        };
        assert_eq!(denial.delivery(), DenialMode::Forward);

        let forwarded = denial.into_forwarded();
        assert_eq!(
            forwarded,
            ForwardedError {
                status_code: 403,
                error: "Forbidden".to_owned(),
                message: "Insufficient scope".to_owned(),
            }
        );

        let json = serde_json::to_value(&forwarded).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "statusCode": 403,
                "error": "Forbidden",
                "message": "Insufficient scope",
            })
        );
    }

    #[test]
    fn repeated_decisions_are_identical() {
        let guard = Guard::new(ScopePolicy::all_of_static("read write"));
        let principal = caller("read");
        let first = guard.decide(Some(&principal));
        let second = guard.decide(Some(&principal));
        assert_eq!(first, second);
    }

    #[test]
    fn default_configuration_applies() {
        let guard = Guard::new(ScopePolicy::unrestricted());
        assert_eq!(guard.scope_attribute(), DEFAULT_SCOPE_ATTRIBUTE);
        assert_eq!(guard.denial_mode(), DenialMode::DirectResponse);
        assert_eq!(guard.policy().mode(), MatchMode::Any);
    }
}
