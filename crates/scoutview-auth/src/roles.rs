//! Role resolution from verified claims
//!
//! Keycloak publishes roles in two places: per client under
//! `resource_access.<client_id>.roles`, and realm-wide under
//! `realm_access.roles`. Client roles win outright when present; the two
//! tiers are never merged.

use crate::jwt::Claims;

/// Resolve the caller's roles for `client_id`
///
/// 1. Non-empty `resource_access[client_id].roles`, verbatim
/// 2. otherwise non-empty `realm_access.roles`, verbatim
/// 3. otherwise no roles
pub fn resolve_roles(claims: &Claims, client_id: &str) -> Vec<String> {
    if let Some(access) = claims.resource_access.get(client_id)
        && !access.roles.is_empty()
    {
        return access.roles.clone();
    }

    if let Some(access) = &claims.realm_access
        && !access.roles.is_empty()
    {
        return access.roles.clone();
    }

    Vec::new()
}
