//! JWT infrastructure: provider key set caching and token validation
//!
//! ```text
//! ┌──────────────────┐     first use only      ┌─────────────────────┐
//! │  TokenValidator  │ ──────────────────────▶ │     KeySetCache     │
//! │  alg/kid/sig/    │                         │  discovery → jwks   │
//! │  aud/iss/exp     │ ◀────── Arc<JwkSet> ─── │  (single-flight)    │
//! └──────────────────┘                         └─────────────────────┘
//! ```
//!
//! - `jwks` - [`KeySetCache`], fetched once per process and shared
//! - `validator` - [`TokenValidator`], offline RS256 verification

pub mod jwks;
pub mod validator;

pub use jwks::KeySetCache;
pub use validator::{EXPECTED_AUDIENCE, TokenValidator};

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Claims consumed from a verified Keycloak access token
///
/// Every field is optional: a token that verifies but omits role or name
/// claims decodes fine and is handled downstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    /// Issuer (iss); already checked by the validator
    #[serde(default)]
    pub iss: Option<String>,

    /// Subject (sub)
    #[serde(default)]
    pub sub: Option<String>,

    /// Expiration time (exp); already checked by the validator
    #[serde(default)]
    pub exp: Option<u64>,

    /// Keycloak login name
    #[serde(default)]
    pub preferred_username: Option<String>,

    /// Email address
    #[serde(default)]
    pub email: Option<String>,

    /// Per-client role grants, keyed by client id
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_access: HashMap<String, RoleClaim>,

    /// Realm-wide role grants
    #[serde(default)]
    pub realm_access: Option<RoleClaim>,
}

impl Claims {
    /// `preferred_username`, falling back to `email`
    pub fn username(&self) -> Option<&str> {
        self.preferred_username
            .as_deref()
            .or(self.email.as_deref())
    }
}

/// A `{ "roles": [...] }` object as Keycloak nests it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleClaim {
    /// Granted roles
    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
}

// Keycloak mappers may emit `null` for an empty container
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
