//! Common test utilities for integration tests
//!
//! A wiremock-backed Keycloak stand-in that serves the realm discovery
//! document and JWKS, plus helpers to mint RS256 tokens with fixture keys.

#![allow(dead_code)]

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use scoutview_auth::{AuthGate, AuthSettings};
use serde_json::{Value, json};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub const REALM: &str = "scouts";
pub const CLIENT_ID: &str = "scoutview";

/// Key id the mock provider publishes for [`PRIMARY_KEY_PEM`]
pub const PRIMARY_KID: &str = "primary-2025";

/// Signing key published in the mock JWKS
pub const PRIMARY_KEY_PEM: &[u8] = include_bytes!("../fixtures/primary.pem");
const PRIMARY_MODULUS: &str = "3i6UJ7xhWzhQTdYr24SyqNNkCXE-akdXw3FQKwFJcSIXNWFqsZ66A-GVammNwaUMzZel3NXddINUMAoJSxJQSyrNqW6JdFdcxFerwPkGG8dBFo4vfoubDX2YuRX7SV6qpSTTfMDtDL5L2n55hHJpo4OFmRtvAdu15-7paH7ZGrn6JYmZjgwIVaJZ6i-4JxyzuJA6ecE3mbhy29vxLNq_BonurFyR-NqJMML9EaB66bOMZhms-1CwFxA_lW3YFSHtHkXwFXioqz_5to0zzOEECplM8kLQni9_2y02sbVaietxmzYNoShtOEOFbZoPIleQ1ah4M21NqVu9znKhctIJlw";

/// Key id for [`ROGUE_KEY_PEM`] when it is published at all
pub const ROGUE_KID: &str = "rogue-2025";

/// A second key; not published by default, used to forge signatures
pub const ROGUE_KEY_PEM: &[u8] = include_bytes!("../fixtures/rogue.pem");
const ROGUE_MODULUS: &str = "ncfTWTgw_WSQCYbwxUNeQ8dyRLsMZWg0utvZMYzkfogVEoRwYV2oOjC0dCWisfrq2zoiCu1V9i8IUMsUNcOuTuA09Fn3gJHjuXXNbhat2kvfrO41JOZhLD0pARw1my_2YlwlPdmJlM-BGk2OnL5GcOaMrwyeD9hfjeFM_rGLq5vt_VZNBmcKZGF6HfKL8Od3-IJnjFtOSuaq2FDktOxoNUeJlJKnzPMSor7093kDk1K2FWHMnbDIxDtXSjcFG8wZphAi6tr6u6uxt1F_6PeV_8_3Jl3tGGpGqUMNEXmYoc5jqO9WjODZx2D9yBzvfyKqxu07HMambHf8a6FmarFckQ";

pub fn discovery_path() -> String {
    format!("/realms/{REALM}/.well-known/openid-configuration")
}

pub fn jwks_path() -> String {
    format!("/realms/{REALM}/protocol/openid-connect/certs")
}

pub fn rsa_jwk(kid: &str, modulus: &str) -> Value {
    json!({
        "kty": "RSA",
        "kid": kid,
        "use": "sig",
        "alg": "RS256",
        "n": modulus,
        "e": "AQAB"
    })
}

pub fn primary_jwk() -> Value {
    rsa_jwk(PRIMARY_KID, PRIMARY_MODULUS)
}

pub fn rogue_jwk() -> Value {
    rsa_jwk(ROGUE_KID, ROGUE_MODULUS)
}

/// Keycloak mock server
pub struct MockKeycloak {
    pub server: MockServer,
}

impl MockKeycloak {
    /// Start a server with no endpoints mounted
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Start a server publishing the primary key, with no call-count expectations
    pub async fn with_primary_key() -> Self {
        let mock = Self::start().await;
        mock.mock_discovery(None, Duration::ZERO).await;
        mock.mock_jwks(vec![primary_jwk()], None).await;
        mock
    }

    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    pub fn issuer(&self) -> String {
        format!("{}/realms/{REALM}", self.base_url())
    }

    pub fn settings(&self, auth_disabled: bool) -> AuthSettings {
        AuthSettings::builder()
            .keycloak_url(self.base_url())
            .realm(REALM)
            .client_id(CLIENT_ID)
            .auth_disabled(auth_disabled)
            .http_timeout(Duration::from_secs(5))
            .build()
            .expect("valid test settings")
    }

    pub fn gate(&self) -> AuthGate {
        AuthGate::new(&self.settings(false)).expect("gate")
    }

    /// Mount the discovery document, optionally asserting the call count
    pub async fn mock_discovery(&self, expect: Option<u64>, delay: Duration) {
        let body = json!({
            "issuer": self.issuer(),
            "jwks_uri": format!("{}{}", self.base_url(), jwks_path()),
            "id_token_signing_alg_values_supported": ["RS256"],
        });
        let mut mock = Mock::given(method("GET"))
            .and(path(discovery_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay));
        if let Some(n) = expect {
            mock = mock.expect(n);
        }
        mock.mount(&self.server).await;
    }

    /// Mount the JWKS endpoint, optionally asserting the call count
    pub async fn mock_jwks(&self, keys: Vec<Value>, expect: Option<u64>) {
        let mut mock = Mock::given(method("GET"))
            .and(path(jwks_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })));
        if let Some(n) = expect {
            mock = mock.expect(n);
        }
        mock.mount(&self.server).await;
    }

    /// Mount a discovery endpoint answering with `status`
    pub async fn mock_discovery_status(&self, status: u16, expect: Option<u64>) {
        let mut mock = Mock::given(method("GET"))
            .and(path(discovery_path()))
            .respond_with(ResponseTemplate::new(status));
        if let Some(n) = expect {
            mock = mock.expect(n);
        }
        mock.mount(&self.server).await;
    }

    /// Mount a discovery document with an arbitrary JSON body
    pub async fn mock_discovery_body(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path(discovery_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }
}

/// Get current Unix timestamp
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

/// Claims of a well-formed Keycloak access token for `issuer`
pub fn keycloak_claims(issuer: &str, username: &str) -> Value {
    let now = current_timestamp();
    json!({
        "exp": now + 300,
        "iat": now,
        "iss": issuer,
        "aud": "account",
        "sub": "3f1c1f8e-5d7e-4a0b-9d55-0c8c1b6b2d41",
        "typ": "Bearer",
        "azp": CLIENT_ID,
        "preferred_username": username,
        "email": format!("{username}@example.org"),
        "realm_access": {"roles": ["offline_access", "viewer"]},
        "resource_access": {
            CLIENT_ID: {"roles": ["checkin"]},
            "account": {"roles": ["manage-account"]}
        },
    })
}

/// Sign `claims` with an RSA PEM key under `kid`
pub fn sign(claims: &Value, key_pem: &[u8], kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(key_pem).expect("Invalid RSA key");
    encode(&header, claims, &key).expect("Failed to encode test JWT")
}

/// Sign `claims` with the published primary key
pub fn sign_primary(claims: &Value) -> String {
    sign(claims, PRIMARY_KEY_PEM, Some(PRIMARY_KID))
}
