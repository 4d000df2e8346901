//! Offline RS256 validation of Keycloak access tokens
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. header decodes and names RS256
//! 2. header carries a `kid` present in the cached key set
//! 3. signature verifies against that key
//! 4. `aud` contains `"account"`, `iss` is the realm issuer, `exp` is in the
//!    future (with the configured leeway)
//!
//! Keycloak issues access tokens with `aud = "account"` regardless of the
//! requesting client, so the audience is a fixed literal rather than the
//! client id.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use tracing::debug;

use super::{Claims, KeySetCache};
use crate::config::AuthSettings;
use crate::error::{AuthError, AuthFailure, AuthResult};

/// Audience every accepted token must carry
pub const EXPECTED_AUDIENCE: &str = "account";

/// The only signing algorithm accepted
const ALLOWED_ALGORITHM: Algorithm = Algorithm::RS256;

/// Registered claims that must be present before they are compared
const REQUIRED_CLAIMS: [&str; 3] = ["exp", "aud", "iss"];

/// Verifies tokens against the provider's cached key set
///
/// # Example
///
/// ```rust,no_run
/// # use scoutview_auth::{AuthSettings, jwt::{KeySetCache, TokenValidator}};
/// # tokio_test::block_on(async {
/// let settings = AuthSettings::from_env()?;
/// let validator = TokenValidator::new(&settings, KeySetCache::new(&settings)?);
///
/// let claims = validator.validate("eyJhbGciOiJSUzI1NiIs...").await?;
/// println!("token for {:?}", claims.username());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TokenValidator {
    /// Expected issuer (iss claim)
    expected_issuer: String,
    /// Clock skew tolerance for exp
    leeway: Duration,
    /// Provider key set
    key_set: KeySetCache,
}

impl TokenValidator {
    /// Create a validator for the realm in `settings`, using `key_set` for keys
    pub fn new(settings: &AuthSettings, key_set: KeySetCache) -> Self {
        Self {
            expected_issuer: settings.issuer(),
            leeway: settings.leeway(),
            key_set,
        }
    }

    /// Validate a token and return its claims
    ///
    /// # Errors
    ///
    /// - [`AuthError::Authentication`] for a malformed token, wrong algorithm,
    ///   unknown key, bad signature, wrong audience or issuer, or expiry
    /// - [`AuthError::Configuration`] if the key set cannot be fetched
    pub async fn validate(&self, token: &str) -> AuthResult<Claims> {
        let header = decode_header(token).map_err(AuthFailure::from)?;

        if header.alg != ALLOWED_ALGORITHM {
            return Err(AuthFailure::DisallowedAlgorithm.into());
        }

        let key_id = header.kid.ok_or(AuthFailure::MissingKeyId)?;
        let decoding_key = self.decoding_key(&key_id).await?;

        let mut validation = Validation::new(ALLOWED_ALGORITHM);
        // aud and iss are only compared when present unless listed here
        validation.set_required_spec_claims(&REQUIRED_CLAIMS);
        validation.set_audience(&[EXPECTED_AUDIENCE]);
        validation.set_issuer(&[&self.expected_issuer]);
        validation.leeway = self.leeway.as_secs();

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(AuthFailure::from)?;

        debug!(
            kid = %key_id,
            subject = ?token_data.claims.sub,
            "JWT validation successful"
        );

        Ok(token_data.claims)
    }

    async fn decoding_key(&self, key_id: &str) -> AuthResult<DecodingKey> {
        let jwks = self.key_set.get_keys().await.map_err(AuthError::from)?;

        let jwk = jwks
            .find(key_id)
            .ok_or_else(|| AuthFailure::UnknownKeyId(key_id.to_string()))?;

        DecodingKey::from_jwk(jwk)
            .map_err(|_| AuthFailure::UnusableKey(key_id.to_string()).into())
    }

    /// The expected issuer
    pub fn expected_issuer(&self) -> &str {
        &self.expected_issuer
    }

    /// The key set this validator draws from
    pub fn key_set(&self) -> &KeySetCache {
        &self.key_set
    }
}
