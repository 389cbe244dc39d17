use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::scope::Scope;

/// The authenticated identity associated with the current request
///
/// A principal is produced by the upstream authentication layer and
/// attached to the request before the guard runs. It carries an optional
/// subject identifier and a flat map of string-valued attributes, one of
/// which (by default `"scope"`) holds the caller's granted scopes as a
/// whitespace-delimited string.
///
/// An absent attribute is a well-defined state: the guard treats it as an
/// empty grant set rather than a fault.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Subject identifier of the caller, when known
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,

    /// Remaining attributes of the caller, keyed by claim name
    #[serde(flatten)]
    attributes: AHashMap<String, String>,
}

impl Principal {
    /// Constructs a principal with no subject and no attributes
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject identifier
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets a named attribute
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// The subject identifier, if one was attached
    #[inline]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Looks up a named attribute
    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The scopes granted to this principal, read from the named attribute
    ///
    /// The attribute value is split on whitespace; invalid tokens are
    /// ignored. An absent attribute yields an empty scope set.
    pub fn granted_scopes(&self, attribute: &str) -> Scope {
        self.attribute(attribute)
            .map(Scope::parse_lenient)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granted_scopes_splits_attribute_value() {
        let principal = Principal::new().with_attribute("scope", "read write");
        let granted = principal.granted_scopes("scope");
        assert_eq!(granted, "read write".parse().unwrap());
    }

    #[test]
    fn absent_attribute_yields_empty_grant() {
        let principal = Principal::new().with_subject("user@example.com");
        assert!(principal.granted_scopes("scope").is_empty());
    }

    #[test]
    fn attributes_are_looked_up_by_name() {
        let principal = Principal::new()
            .with_attribute("scope", "read")
            .with_attribute("permissions", "admin");
        assert_eq!(principal.attribute("permissions"), Some("admin"));
        assert_eq!(principal.attribute("missing"), None);
    }

    #[test]
    fn deserializes_from_claim_payload() {
        let principal: Principal = serde_json::from_str(
            r#"{ "sub": "user@example.com", "scope": "read write" }"#,
        )
        .unwrap();
        assert_eq!(principal.subject(), Some("user@example.com"));
        assert_eq!(principal.attribute("scope"), Some("read write"));
    }
}
