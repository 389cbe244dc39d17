//! Scope tokens and scope sets
//!
//! Scope tokens follow the definition in
//! [RFC 6749, Section 3.3](https://datatracker.ietf.org/doc/html/rfc6749#section-3.3).

use std::{collections::hash_set, str::FromStr};

use ahash::AHashSet;
use aliri_braid::braid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An invalid scope token
#[derive(Debug, Error)]
pub enum InvalidScopeToken {
    /// The scope token was the empty string
    #[error("scope token cannot be empty")]
    Empty,
    /// The scope token contained an invalid byte
    #[error("invalid scope token byte at position {position}: 0x{value:02x}")]
    InvalidByte {
        /// The index in the scope token where the invalid byte was found
        position: usize,
        /// The invalid byte value
        value: u8,
    },
}

// The braid validator contract requires `Validator::Error` to implement
// `From<Infallible>`; this expands to a `match x {}` and is never invoked.
aliri_braid::from_infallible!(InvalidScopeToken);

/// A scope token as defined in RFC 6749, Section 3.3
///
/// A scope token must be composed of printable ASCII characters excluding
/// ` ` (space), `"` (double quote), and `\` (backslash). Because of this
/// restriction, a scope token is always usable verbatim inside a quoted
/// `WWW-Authenticate` challenge parameter.
#[braid(
    serde,
    validator,
    ref_doc = "A borrowed reference to a [`ScopeToken`]"
)]
pub struct ScopeToken;

impl aliri_braid::Validator for ScopeToken {
    type Error = InvalidScopeToken;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.is_empty() {
            return Err(InvalidScopeToken::Empty);
        }

        // NQCHAR / NQSCHAR minus the quoting hazards: %x21 / %x23-5B / %x5D-7E
        for (position, &value) in s.as_bytes().iter().enumerate() {
            if !matches!(value, 0x21 | 0x23..=0x5B | 0x5D..=0x7E) {
                return Err(InvalidScopeToken::InvalidByte { position, value });
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum ScopeRepr {
    Joined(String),
    Tokens(Vec<ScopeToken>),
}

impl TryFrom<ScopeRepr> for Scope {
    type Error = InvalidScopeToken;

    fn try_from(repr: ScopeRepr) -> Result<Self, Self::Error> {
        match repr {
            ScopeRepr::Joined(s) => s.parse(),
            ScopeRepr::Tokens(tokens) => Ok(tokens.into_iter().collect()),
        }
    }
}

impl From<Scope> for ScopeRepr {
    fn from(scope: Scope) -> Self {
        let tokens: Vec<_> = scope
            .0
            .into_iter()
            .map(ScopeToken::take)
            .collect();
        ScopeRepr::Joined(tokens.join(" "))
    }
}

/// A set of scope tokens granted to a caller
///
/// Serialization accepts either a single whitespace-delimited string or an
/// array of tokens, the two representations found in real token payloads;
/// it always serializes back to the delimited form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScopeRepr", into = "ScopeRepr")]
pub struct Scope(AHashSet<ScopeToken>);

impl Scope {
    /// Produces an empty scope set
    #[inline]
    pub fn empty() -> Self {
        Self(AHashSet::new())
    }

    /// Constructs a scope set holding a single token
    #[inline]
    pub fn single(token: ScopeToken) -> Self {
        let mut s = Self::empty();
        s.insert(token);
        s
    }

    /// Adds a scope token to the set
    #[inline]
    pub fn insert(&mut self, token: ScopeToken) {
        self.0.insert(token);
    }

    /// Parses a whitespace-delimited value, ignoring invalid tokens
    ///
    /// Used for granted scopes read off a principal at request time: a
    /// malformed token could never match a valid required token, so it is
    /// dropped rather than allowed to fail the whole evaluation.
    pub fn parse_lenient(s: &str) -> Self {
        s.split_whitespace()
            .filter_map(|raw| match ScopeToken::new(raw.to_string()) {
                Ok(token) => Some(token),
                Err(error) => {
                    tracing::debug!(%error, token = raw, "ignoring invalid scope token");
                    None
                }
            })
            .collect()
    }

    /// Checks whether the set contains the given token
    #[inline]
    pub fn contains(&self, token: &ScopeTokenRef) -> bool {
        self.0.contains(token)
    }

    /// Whether the set contains no tokens
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of tokens in the set
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Produces an iterator over the tokens in this set
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ScopeTokenRef> {
        self.into_iter()
    }
}

impl IntoIterator for Scope {
    type Item = ScopeToken;
    type IntoIter = <AHashSet<ScopeToken> as IntoIterator>::IntoIter;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// An iterator over a set of borrowed scope tokens
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    iter: hash_set::Iter<'a, ScopeToken>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a ScopeTokenRef;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|t| t.as_ref())
    }
}

impl<'a> IntoIterator for &'a Scope {
    type Item = &'a ScopeTokenRef;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        Iter {
            iter: self.0.iter(),
        }
    }
}

impl Extend<ScopeToken> for Scope {
    #[inline]
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = ScopeToken>,
    {
        self.0.extend(iter)
    }
}

impl FromIterator<ScopeToken> for Scope {
    #[inline]
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = ScopeToken>,
    {
        let mut set = Self::empty();
        set.extend(iter);
        set
    }
}

impl TryFrom<&'_ str> for Scope {
    type Error = InvalidScopeToken;

    #[inline]
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.split_whitespace()
            .map(|s| ScopeToken::new(s.to_string()))
            .collect()
    }
}

impl TryFrom<String> for Scope {
    type Error = InvalidScopeToken;

    #[inline]
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_from(s.as_str())
    }
}

impl FromStr for Scope {
    type Err = InvalidScopeToken;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_accepts_rfc6749_charset() {
        let t = ScopeToken::new("https://example.com/scopes/read:widget".to_string()).unwrap();
        assert_eq!(t.as_str(), "https://example.com/scopes/read:widget");
    }

    #[test]
    fn token_rejects_empty() {
        assert!(matches!(
            ScopeToken::new("".to_string()),
            Err(InvalidScopeToken::Empty)
        ));
    }

    #[test]
    fn token_rejects_space() {
        assert!(matches!(
            ScopeToken::new("read write".to_string()),
            Err(InvalidScopeToken::InvalidByte { position: 4, value: 0x20 })
        ));
    }

    #[test]
    fn token_rejects_quote_and_backslash() {
        assert!(matches!(
            ScopeToken::new("re\"ad".to_string()),
            Err(InvalidScopeToken::InvalidByte { .. })
        ));
        assert!(matches!(
            ScopeToken::new("re\\ad".to_string()),
            Err(InvalidScopeToken::InvalidByte { .. })
        ));
    }

    #[test]
    fn token_rejects_non_ascii() {
        assert!(matches!(
            ScopeToken::new("lectura™".to_string()),
            Err(InvalidScopeToken::InvalidByte { .. })
        ));
    }

    #[test]
    fn parses_whitespace_delimited() {
        let scope: Scope = "read  write\tadmin".parse().unwrap();
        assert_eq!(scope.len(), 3);
        assert!(scope.contains(ScopeTokenRef::from_str("write").unwrap()));
    }

    #[test]
    fn strict_parse_fails_on_invalid_token() {
        assert!("read wr\"ite".parse::<Scope>().is_err());
    }

    #[test]
    fn lenient_parse_drops_invalid_tokens() {
        let scope = Scope::parse_lenient("read wr\"ite admin");
        assert_eq!(scope.len(), 2);
        assert!(scope.contains(ScopeTokenRef::from_str("read").unwrap()));
        assert!(scope.contains(ScopeTokenRef::from_str("admin").unwrap()));
    }

    #[test]
    fn deserializes_from_string_and_array() {
        let from_string: Scope = serde_json::from_str(r#""read write""#).unwrap();
        let from_array: Scope = serde_json::from_str(r#"["read", "write"]"#).unwrap();
        assert_eq!(from_string, from_array);
    }

    #[test]
    fn serializes_to_delimited_string() {
        let scope = Scope::single(ScopeToken::new("read".to_string()).unwrap());
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, r#""read""#);
    }
}
