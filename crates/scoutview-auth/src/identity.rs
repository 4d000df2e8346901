//! Caller identity handed to the API layer

use std::fmt;

use serde::Serialize;

/// Username of the identity synthesized by the development bypass
pub const DEV_USERNAME: &str = "dev@scouterna.se";

/// Role granting access to every role-guarded operation
pub const ADMIN_ROLE: &str = "admin";

/// Verified caller identity
///
/// Only produced by [`AuthGate`](crate::AuthGate): either from a token that
/// passed signature, audience, issuer and expiry checks, or by the explicit
/// development bypass. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    username: String,
    roles: Vec<String>,
}

impl Identity {
    pub(crate) fn new(username: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            username: username.into(),
            roles,
        }
    }

    /// The fixed identity returned by the development bypass
    pub fn development() -> Self {
        Self::new(DEV_USERNAME, vec![ADMIN_ROLE.to_string()])
    }

    /// Preferred username, or email when the provider sends none
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Roles in the order the provider listed them
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Check whether the caller may act in `role`
    ///
    /// Holders of [`ADMIN_ROLE`] pass every role check.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role || r == ADMIN_ROLE)
    }

    /// Check whether the caller holds the admin role
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ADMIN_ROLE)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}
