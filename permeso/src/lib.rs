//! Scope-based request authorization.
//!
//! This crate decides whether an already-authenticated caller may access a
//! protected resource, based on the scopes granted to the caller and the
//! scopes the resource requires. It sits downstream of authentication
//! (which attaches a [`Principal`] to the request) and upstream of the
//! protected handler. Token parsing and verification are deliberately out
//! of scope.
//!
//! The decision logic here is transport-free; the `permeso_tower` crate
//! delivers it as middleware for `tower`/`axum` services, including
//! construction of the RFC 6750 bearer challenge on denial.
//!
//! # Example
//!
//! ```
//! use permeso::{Decision, Guard, Principal, ScopePolicy};
//!
//! let guard = Guard::new(ScopePolicy::all_of_static("read write"));
//!
//! let caller = Principal::new().with_attribute("scope", "read write admin");
//! assert!(matches!(guard.decide(Some(&caller)), Decision::Allow));
//!
//! let caller = Principal::new().with_attribute("scope", "read");
//! assert!(matches!(guard.decide(Some(&caller)), Decision::Deny(_)));
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod guard;
mod policy;
mod principal;
pub mod scope;

pub use guard::{
    Decision, Denial, DenialMode, ForwardedError, Guard, DEFAULT_SCOPE_ATTRIBUTE,
};
pub use policy::{InsufficientScope, MatchMode, ScopePolicy};
pub use principal::Principal;
pub use scope::{InvalidScopeToken, Scope, ScopeToken, ScopeTokenRef};
