use std::{fmt, marker::PhantomData};

use http::{header, HeaderValue, Request, Response, StatusCode};
use permeso::{Decision, Denial, DenialMode, ForwardedError, Guard, Principal};
use tower_http::validate_request::{ValidateRequest, ValidateRequestHeaderLayer};

use crate::rfc6750;

/// Middleware that runs a [`Guard`] against each inbound request
///
/// The request's [`Principal`] is expected to have been attached to the
/// request extensions by the upstream authentication layer; a request
/// without one is denied whenever the guard's policy is restricted.
///
/// Denials are rendered through an [`OnDenial`] handler. The
/// [`DefaultDenialHandler`] answers direct denials with the RFC 6750
/// bearer challenge and forwarded denials with a JSON rendering of the
/// descriptor; installing a custom handler with
/// [`with_denial_handler`][Self::with_denial_handler] supplies the "next
/// error-handling stage" for guards configured to forward.
pub struct RequireScope<OnError> {
    guard: Guard,
    on_error: OnError,
}

impl<OnError> Clone for RequireScope<OnError>
where
    OnError: Clone,
{
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<OnError> fmt::Debug for RequireScope<OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RequireScope")
            .field("guard", &self.guard)
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl<ResBody> RequireScope<DefaultDenialHandler<ResBody>> {
    /// Constructs middleware enforcing the given guard
    #[inline]
    pub fn new(guard: Guard) -> Self {
        Self {
            guard,
            on_error: DefaultDenialHandler::new(),
        }
    }

    /// Constructs a layer enforcing the given guard
    #[inline]
    pub fn layer(guard: Guard) -> ValidateRequestHeaderLayer<Self> {
        ValidateRequestHeaderLayer::custom(Self::new(guard))
    }
}

impl<OnError> RequireScope<OnError> {
    /// Attaches a custom denial handler
    #[inline]
    pub fn with_denial_handler<Handler>(self, on_error: Handler) -> RequireScope<Handler> {
        RequireScope {
            guard: self.guard,
            on_error,
        }
    }

    /// Wraps this middleware into a layer
    #[inline]
    pub fn into_layer(self) -> ValidateRequestHeaderLayer<Self> {
        ValidateRequestHeaderLayer::custom(self)
    }
}

impl<OnError, ReqBody> ValidateRequest<ReqBody> for RequireScope<OnError>
where
    OnError: OnDenial,
{
    type ResponseBody = OnError::Body;

    fn validate(
        &mut self,
        request: &mut Request<ReqBody>,
    ) -> Result<(), Response<Self::ResponseBody>> {
        let principal = request.extensions().get::<Principal>();

        match self.guard.decide(principal) {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => {
                tracing::debug!(scope = %denial.scope(), "request denied: insufficient scope");
                Err(match denial.delivery() {
                    DenialMode::DirectResponse => self.on_error.on_insufficient_scope(&denial),
                    DenialMode::Forward => self.on_error.on_forward(denial.into_forwarded()),
                })
            }
        }
    }
}

/// Handler for rendering responses to denied requests
///
/// Direct denials call [`on_insufficient_scope`][Self::on_insufficient_scope];
/// forwarded denials call [`on_forward`][Self::on_forward] with the
/// structured descriptor, leaving final presentation to the handler.
pub trait OnDenial {
    /// The body type of the generated responses
    type Body;

    /// Response when the guard denies in direct-response mode
    fn on_insufficient_scope(&self, denial: &Denial) -> Response<Self::Body>;

    /// Response when the guard denies in forward mode
    fn on_forward(&self, error: ForwardedError) -> Response<Self::Body>;
}

/// The built-in denial responder
///
/// Answers direct denials with the RFC 6750 challenge response and
/// forwarded denials with a `403` JSON body carrying the descriptor.
pub struct DefaultDenialHandler<ResBody> {
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> DefaultDenialHandler<ResBody> {
    /// Instantiates a new instance over a given body type
    #[inline]
    pub fn new() -> Self {
        Self { _ty: PhantomData }
    }
}

impl<ResBody> fmt::Debug for DefaultDenialHandler<ResBody> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("DefaultDenialHandler")
    }
}

impl<ResBody> Default for DefaultDenialHandler<ResBody> {
    #[inline]
    fn default() -> Self {
        Self { _ty: PhantomData }
    }
}

impl<ResBody> Clone for DefaultDenialHandler<ResBody> {
    #[inline]
    fn clone(&self) -> Self {
        Self { _ty: PhantomData }
    }
}

impl<ResBody> Copy for DefaultDenialHandler<ResBody> {}

impl<ResBody> OnDenial for DefaultDenialHandler<ResBody>
where
    ResBody: From<String>,
{
    type Body = ResBody;

    #[inline]
    fn on_insufficient_scope(&self, denial: &Denial) -> Response<Self::Body> {
        rfc6750::forbidden(denial)
    }

    fn on_forward(&self, error: ForwardedError) -> Response<Self::Body> {
        let status = StatusCode::from_u16(error.status_code)
            .unwrap_or(StatusCode::FORBIDDEN);
        let body = serde_json::to_string(&error).expect("descriptor serializes to JSON");

        let mut response = Response::new(ResBody::from(body));
        *response.status_mut() = status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}
