//! Entry point of the authentication pipeline
//!
//! [`AuthGate::authenticate`] turns an optional bearer token into an
//! [`Identity`]:
//!
//! - **Bypass**: auth is disabled *and* no token was presented. Returns
//!   [`Identity::development`] without touching the validator.
//! - **Verify**: every other case. A token presented while auth is disabled is
//!   still fully verified.
//!
//! Errors from the validator are classified once here and logged with a
//! reason code before being returned.

use tracing::{debug, error, warn};

use crate::config::AuthSettings;
use crate::error::{AuthError, AuthFailure, AuthResult, KeySetError};
use crate::identity::Identity;
use crate::jwt::{KeySetCache, TokenValidator};
use crate::roles::resolve_roles;

/// Authenticates bearer tokens into [`Identity`] values
#[derive(Debug, Clone)]
pub struct AuthGate {
    validator: TokenValidator,
    client_id: String,
    auth_disabled: bool,
}

impl AuthGate {
    /// Build a gate with its own key-set cache
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Configuration`] if the HTTP client for the key-set
    /// cache cannot be built.
    pub fn new(settings: &AuthSettings) -> AuthResult<Self> {
        let key_set = KeySetCache::new(settings)?;
        Ok(Self::with_validator(
            settings,
            TokenValidator::new(settings, key_set),
        ))
    }

    /// Build a gate around an existing validator
    pub fn with_validator(settings: &AuthSettings, validator: TokenValidator) -> Self {
        if settings.auth_disabled {
            warn!(
                "Authentication is disabled: requests without a bearer token \
                 are treated as the development admin user"
            );
        }
        Self {
            validator,
            client_id: settings.keycloak_client_id.clone(),
            auth_disabled: settings.auth_disabled,
        }
    }

    /// Authenticate a request's bearer token
    ///
    /// An empty token is treated as absent.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Authentication`] when the token is missing (and the
    ///   bypass is off) or fails verification, or when an unexpected
    ///   internal fault occurs
    /// - [`AuthError::Configuration`] when the provider's keys cannot be
    ///   fetched
    pub async fn authenticate(&self, token: Option<&str>) -> AuthResult<Identity> {
        let token = token.map(str::trim).filter(|t| !t.is_empty());

        let Some(token) = token else {
            if self.auth_disabled {
                debug!("No bearer token and auth disabled, using development identity");
                return Ok(Identity::development());
            }
            return Err(self.reject(AuthFailure::MissingToken.into()));
        };

        self.verify(token).await.map_err(|e| self.reject(e))
    }

    async fn verify(&self, token: &str) -> AuthResult<Identity> {
        let claims = self.validator.validate(token).await?;

        let username = claims
            .username()
            .ok_or(AuthFailure::MissingUsername)?
            .to_string();
        let roles = resolve_roles(&claims, &self.client_id);

        debug!(username = %username, roles = ?roles, "Authenticated request");
        Ok(Identity::new(username, roles))
    }

    /// Classify and log a pipeline failure
    fn reject(&self, err: AuthError) -> AuthError {
        match err {
            AuthError::Configuration(KeySetError::FetchAborted(detail)) => {
                error!(
                    reason = AuthFailure::Unexpected.as_str(),
                    error = %detail,
                    "Unexpected fault during authentication"
                );
                AuthFailure::Unexpected.into()
            }
            AuthError::Configuration(e) => {
                error!(error = %e, "Identity provider configuration error");
                AuthError::Configuration(e)
            }
            AuthError::Authentication(AuthFailure::Unexpected) => {
                error!(
                    reason = AuthFailure::Unexpected.as_str(),
                    "Unexpected fault during authentication"
                );
                AuthFailure::Unexpected.into()
            }
            AuthError::Authentication(reason) => {
                warn!(reason = reason.as_str(), detail = %reason, "Token validation failed");
                AuthError::Authentication(reason)
            }
        }
    }

    /// Whether the development bypass is enabled
    pub fn auth_disabled(&self) -> bool {
        self.auth_disabled
    }

    /// Client id used for role resolution
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The underlying validator
    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }
}
