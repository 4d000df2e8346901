//! Tower Service implementation for authentication
//!
//! Works with any `http::Request<B>` service (Axum routers, hyper services,
//! `tower::service_fn`). The flow for each request:
//!
//! 1. Extract the bearer token from the `Authorization` header
//! 2. Authenticate it with the [`AuthGate`]
//! 3. On success, insert the [`Identity`](crate::Identity) into the request
//!    extensions and call the inner service
//! 4. On failure, answer directly with 401 or 500

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use http::{HeaderValue, Request, Response};
use tower::Service;

use crate::AuthGate;
use crate::error::AuthError;

use super::bearer_token;

const UNAUTHORIZED_BODY: &str = r#"{"detail":"Could not validate credentials"}"#;
const CONFIGURATION_BODY: &str =
    r#"{"detail":"Server configuration error: could not fetch identity provider public keys"}"#;

/// Tower Service that performs authentication
///
/// # Type Parameters
///
/// * `S` - The inner service type
#[derive(Debug, Clone)]
pub struct AuthService<S> {
    inner: S,
    gate: Arc<AuthGate>,
}

impl<S> AuthService<S> {
    /// Create a new auth service
    pub fn new(inner: S, gate: Arc<AuthGate>) -> Self {
        Self { inner, gate }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

/// Future type for auth service responses
pub type AuthServiceFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// Build the rejection response for an authentication pipeline error
fn rejection<ResBody>(err: &AuthError) -> Response<ResBody>
where
    ResBody: From<&'static str>,
{
    let body = match err {
        AuthError::Authentication(_) => UNAUTHORIZED_BODY,
        AuthError::Configuration(_) => CONFIGURATION_BODY,
    };

    let mut response = Response::new(ResBody::from(body));
    *response.status_mut() = err.status_code();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if err.is_authentication() {
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    response
}

impl<S, B, ResBody> Service<Request<B>> for AuthService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: From<&'static str> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = AuthServiceFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let token = bearer_token(req.headers()).map(str::to_owned);
        let gate = Arc::clone(&self.gate);

        // The readied service goes into the future; keep a fresh clone here
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match gate.authenticate(token.as_deref()).await {
                Ok(identity) => {
                    req.extensions_mut().insert(identity);
                    inner.call(req).await
                }
                Err(e) => Ok(rejection(&e)),
            }
        })
    }
}
