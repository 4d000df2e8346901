//! Error taxonomy for the authentication pipeline
//!
//! Callers only ever see two kinds of failure:
//!
//! - [`AuthError::Authentication`] - the caller's credential was missing or did
//!   not verify. Maps to `401 Unauthorized`.
//! - [`AuthError::Configuration`] - the identity provider could not be reached
//!   or published an unusable discovery/key-set document. Maps to
//!   `500 Internal Server Error` and never prompts the caller to retry with
//!   other credentials.
//!
//! Both carry a reason for logging, but neither exposes internal detail through
//! [`AuthError::public_message`].

use http::StatusCode;
use thiserror::Error;

/// Result alias used throughout the crate
pub type AuthResult<T> = Result<T, AuthError>;

/// Error returned by [`AuthGate::authenticate`](crate::AuthGate::authenticate)
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The bearer credential was missing, malformed or failed verification
    #[error("authentication failed: {0}")]
    Authentication(AuthFailure),

    /// The identity provider's signing keys could not be obtained
    #[error("identity provider configuration error: {0}")]
    Configuration(#[from] KeySetError),
}

impl AuthError {
    /// HTTP status this error should be surfaced as
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed, caller-safe description of this error
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "Could not validate credentials",
            Self::Configuration(_) => {
                "Server configuration error: could not fetch identity provider public keys"
            }
        }
    }

    /// Whether this is an authentication (caller) failure
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// Whether this is a configuration (operator) failure
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// The authentication failure reason, if any
    pub fn failure(&self) -> Option<&AuthFailure> {
        match self {
            Self::Authentication(reason) => Some(reason),
            Self::Configuration(_) => None,
        }
    }
}

impl From<AuthFailure> for AuthError {
    fn from(reason: AuthFailure) -> Self {
        Self::Authentication(reason)
    }
}

/// Why a credential was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// No bearer token was presented and the development bypass is off
    #[error("no bearer token presented")]
    MissingToken,

    /// The token is not a well-formed JWT
    #[error("malformed token")]
    MalformedToken,

    /// The token header names an algorithm other than RS256
    #[error("token algorithm is not allowed")]
    DisallowedAlgorithm,

    /// The token header carries no key identifier
    #[error("token header has no key id")]
    MissingKeyId,

    /// The key identifier does not appear in the provider's key set
    #[error("key id '{0}' not found in provider key set")]
    UnknownKeyId(String),

    /// The matching JWK could not be turned into a verification key
    #[error("provider key '{0}' is unusable")]
    UnusableKey(String),

    /// Signature verification failed
    #[error("invalid token signature")]
    BadSignature,

    /// The `aud` claim does not contain the expected audience
    #[error("token audience mismatch")]
    WrongAudience,

    /// The `iss` claim is not the configured realm issuer
    #[error("token issuer mismatch")]
    WrongIssuer,

    /// The token's `exp` is in the past
    #[error("token expired")]
    Expired,

    /// A registered claim required for verification is absent
    #[error("token is missing required claim '{0}'")]
    MissingClaim(String),

    /// Neither `preferred_username` nor `email` is present
    #[error("token carries no username or email claim")]
    MissingUsername,

    /// Verification failed for a reason not covered above
    #[error("token rejected")]
    Rejected,

    /// An internal fault occurred; treated as a failed authentication
    #[error("unexpected authentication fault")]
    Unexpected,
}

impl AuthFailure {
    /// Stable reason code for structured log events
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::MalformedToken => "malformed_token",
            Self::DisallowedAlgorithm => "disallowed_algorithm",
            Self::MissingKeyId => "missing_kid",
            Self::UnknownKeyId(_) => "unknown_kid",
            Self::UnusableKey(_) => "unusable_key",
            Self::BadSignature => "bad_signature",
            Self::WrongAudience => "wrong_audience",
            Self::WrongIssuer => "wrong_issuer",
            Self::Expired => "expired",
            Self::MissingClaim(_) => "missing_claim",
            Self::MissingUsername => "missing_username",
            Self::Rejected => "rejected",
            Self::Unexpected => "unexpected",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthFailure {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::InvalidAudience => Self::WrongAudience,
            ErrorKind::InvalidIssuer => Self::WrongIssuer,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::DisallowedAlgorithm,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Self::MalformedToken,
            _ => Self::Rejected,
        }
    }
}

/// Failure to obtain the provider's signing key set
///
/// One failed fetch is delivered to every caller that waited on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySetError {
    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    /// The discovery document request did not complete
    #[error("discovery document at '{url}' unreachable: {reason}")]
    DiscoveryUnreachable {
        /// Discovery URL
        url: String,
        /// Transport error
        reason: String,
    },

    /// The discovery endpoint answered with a non-success status
    #[error("discovery document at '{url}' returned status {status}")]
    DiscoveryStatus {
        /// Discovery URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The discovery document is not valid JSON
    #[error("discovery document at '{url}' is malformed: {reason}")]
    DiscoveryMalformed {
        /// Discovery URL
        url: String,
        /// Parse error
        reason: String,
    },

    /// The discovery document has no usable `jwks_uri`
    #[error("discovery document at '{url}' has no jwks_uri")]
    MissingJwksUri {
        /// Discovery URL
        url: String,
    },

    /// The key-set request did not complete
    #[error("key set at '{url}' unreachable: {reason}")]
    KeySetUnreachable {
        /// JWKS URI
        url: String,
        /// Transport error
        reason: String,
    },

    /// The key-set endpoint answered with a non-success status
    #[error("key set at '{url}' returned status {status}")]
    KeySetStatus {
        /// JWKS URI
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The key-set document is not a valid JWKS
    #[error("key set at '{url}' is malformed: {reason}")]
    KeySetMalformed {
        /// JWKS URI
        url: String,
        /// Parse error
        reason: String,
    },

    /// The background fetch task ended without producing a result
    #[error("key set fetch aborted: {0}")]
    FetchAborted(String),
}
