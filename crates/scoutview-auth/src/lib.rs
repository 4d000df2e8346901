//! # ScoutView Auth - Keycloak bearer-token authentication
//!
//! Verifies access tokens issued by a Keycloak (OpenID Connect) realm and
//! turns them into an [`Identity`] (username + roles) for the API layer.
//!
//! ## Architecture
//!
//! ```text
//!   Authorization: Bearer <token>
//!               │
//!               ▼
//!   ┌───────────────────────┐  auth disabled + no token
//!   │       AuthGate        │ ─────────────────────────▶ Identity::development()
//!   └───────────┬───────────┘
//!               ▼
//!   ┌───────────────────────┐        ┌──────────────────┐
//!   │    TokenValidator     │ ─────▶ │   KeySetCache    │  discovery + JWKS,
//!   │ RS256/kid/aud/iss/exp │        │  (single-flight) │  once per process
//!   └───────────┬───────────┘        └──────────────────┘
//!               ▼
//!   ┌───────────────────────┐
//!   │     resolve_roles     │  client roles, else realm roles
//!   └───────────┬───────────┘
//!               ▼
//!           Identity
//! ```
//!
//! - [`config`] - [`AuthSettings`] loaded from the environment or a file
//! - [`jwt`] - [`KeySetCache`](jwt::KeySetCache) and
//!   [`TokenValidator`](jwt::TokenValidator)
//! - [`roles`] - role precedence rules
//! - [`gate`] - [`AuthGate`], bypass handling and error classification
//! - `tower` - HTTP middleware inserting the [`Identity`] into requests
//!   (`middleware` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scoutview_auth::{AuthGate, AuthSettings};
//!
//! # tokio_test::block_on(async {
//! let settings = AuthSettings::from_env()?;
//! let gate = AuthGate::new(&settings)?;
//!
//! let identity = gate.authenticate(Some("eyJhbGciOiJSUzI1NiIs...")).await?;
//! if identity.has_role("checkin") {
//!     println!("{} may check in participants", identity);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod gate;
pub mod identity;
pub mod jwt;
pub mod roles;
#[cfg(feature = "middleware")]
#[cfg_attr(docsrs, doc(cfg(feature = "middleware")))]
pub mod tower;

#[doc(inline)]
pub use config::{AuthSettings, AuthSettingsBuilder, ConfigError};

#[doc(inline)]
pub use error::{AuthError, AuthFailure, AuthResult, KeySetError};

#[doc(inline)]
pub use gate::AuthGate;

#[doc(inline)]
pub use identity::{ADMIN_ROLE, DEV_USERNAME, Identity};

#[doc(inline)]
pub use jwt::Claims;

#[doc(inline)]
pub use roles::resolve_roles;
