//! # Tower middleware
//!
//! [`AuthLayer`] wraps any `http::Request` service with bearer-token
//! authentication through an [`AuthGate`](crate::AuthGate):
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use scoutview_auth::{AuthGate, tower::AuthLayer};
//!
//! let service = ServiceBuilder::new()
//!     .layer(AuthLayer::new(gate))
//!     .service(my_inner_service);
//! ```
//!
//! ## Request Extensions
//!
//! On success the [`Identity`](crate::Identity) is inserted into the
//! request's extensions:
//!
//! ```rust,ignore
//! if let Some(identity) = req.extensions().get::<Identity>() {
//!     println!("Authenticated user: {}", identity);
//! }
//! ```
//!
//! ## Rejections
//!
//! | Error kind       | Status | `WWW-Authenticate` |
//! |------------------|--------|--------------------|
//! | Authentication   | 401    | `Bearer`           |
//! | Configuration    | 500    | -                  |
//!
//! The body is a fixed JSON `{"detail": ...}` message with no internal detail.

mod layer;
mod service;

pub use layer::AuthLayer;
pub use service::{AuthService, AuthServiceFuture};

use http::HeaderMap;
use http::header::AUTHORIZATION;

/// Extract the token from an `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively. Other schemes, a missing header
/// and an empty token all yield `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("BEARER abc")), Some("abc"));
    }

    #[test]
    fn test_other_schemes_ignored() {
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("ApiKey abc")), None);
    }

    #[test]
    fn test_missing_or_empty() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&headers("Bearer    ")), None);
    }
}
