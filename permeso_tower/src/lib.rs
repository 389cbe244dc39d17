//! Tower middleware that enforces scope-based authorization policies from
//! `permeso`.
//!
//! The middleware expects the upstream authentication layer to have
//! attached a [`permeso::Principal`] to the request extensions. Each
//! request is then decided by a [`permeso::Guard`]: allowed requests
//! proceed to the inner service; denied requests are answered with an
//! RFC 6750 bearer challenge, or handed to a custom error-handling stage
//! when the guard is configured to forward denials.
//!
//! See the `examples` folder in the repository for a working `axum`
//! server.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use permeso::{Guard, ScopePolicy};
//! use permeso_tower::RequireScope;
//!
//! async fn read_widgets() -> &'static str {
//!     "widgets"
//! }
//!
//! let app: Router = Router::new().route(
//!     "/widgets",
//!     get(read_widgets)
//!         .layer(RequireScope::layer(Guard::new(ScopePolicy::any_of_static("read")))),
//! );
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

mod require;
pub mod rfc6750;

pub use require::{DefaultDenialHandler, OnDenial, RequireScope};
