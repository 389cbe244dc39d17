//! Denial responses in the RFC 6750 bearer challenge format
//!
//! See [RFC 6750, Section 3](https://datatracker.ietf.org/doc/html/rfc6750#section-3).

use http::{header, HeaderValue, Response, StatusCode};
use permeso::Denial;

/// Builds a `403 Forbidden` response for a denied request
///
/// The prepared response has the form:
///
/// ```http
/// HTTP/1.1 403 Forbidden
/// www-authenticate: Bearer scope="{required scopes}", error="Insufficient scope"
///
/// Insufficient scope
/// ```
pub fn forbidden<Body>(denial: &Denial) -> Response<Body>
where
    Body: From<String>,
{
    let mut response = Response::new(Body::from(denial.message().to_owned()));
    *response.status_mut() = StatusCode::FORBIDDEN;
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, challenge(denial));
    response
}

// Scope tokens exclude `"`, `\`, and non-printable bytes, and the denial
// message is fixed, so the rendered challenge is always a valid header
// value.
fn challenge(denial: &Denial) -> HeaderValue {
    HeaderValue::try_from(denial.www_authenticate())
        .expect("challenge is a valid header value")
}
