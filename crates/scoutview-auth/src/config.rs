//! Authentication settings
//!
//! [`AuthSettings`] is an immutable snapshot of everything the pipeline needs
//! to know about the identity provider. It is read once at startup, either
//! from the process environment ([`AuthSettings::from_env`]) or from a config
//! file with environment overrides ([`AuthSettings::from_file`]), and is never
//! mutated afterwards.
//!
//! | Variable                 | Field                | Default |
//! |--------------------------|----------------------|---------|
//! | `KEYCLOAK_URL`           | `keycloak_url`       | -       |
//! | `KEYCLOAK_REALM`         | `keycloak_realm`     | -       |
//! | `KEYCLOAK_CLIENT_ID`     | `keycloak_client_id` | -       |
//! | `AUTH_DISABLED`          | `auth_disabled`      | `false` |
//! | `AUTH_LEEWAY_SECS`       | `leeway_secs`        | `0`     |
//! | `AUTH_HTTP_TIMEOUT_SECS` | `http_timeout_secs`  | `10`    |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Default timeout for each outbound request to the identity provider
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Settings loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("Unsupported configuration file format. Use .toml, .yaml, .yml, or .json")]
    UnsupportedFormat,

    /// Configuration parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// A required provider setting is empty
    #[error("Missing required setting '{0}' (auth is enabled)")]
    MissingSetting(&'static str),
}

/// Identity provider settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSettings {
    /// Base URL of the Keycloak server, e.g. `https://id.example.org`
    #[serde(default)]
    pub keycloak_url: String,

    /// Realm whose tokens are accepted
    #[serde(default)]
    pub keycloak_realm: String,

    /// Client whose `resource_access` roles take precedence
    #[serde(default)]
    pub keycloak_client_id: String,

    /// Development bypass: requests without a token get the dev identity
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub auth_disabled: bool,

    /// Clock-skew tolerance applied to `exp`, in seconds
    #[serde(default, alias = "auth_leeway_secs")]
    pub leeway_secs: u64,

    /// Per-request timeout for discovery and key-set fetches, in seconds
    #[serde(default = "default_http_timeout", alias = "auth_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

// Only a case-insensitive "true" enables a flag; anything else disables it.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Text(text) => text.trim().eq_ignore_ascii_case("true"),
    })
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            keycloak_url: String::new(),
            keycloak_realm: String::new(),
            keycloak_client_id: String::new(),
            auth_disabled: false,
            leeway_secs: 0,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl AuthSettings {
    /// Load settings from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be converted to its field type or
    /// if a provider setting is empty while authentication is enabled.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    /// Load settings from an explicit set of variables instead of the process
    /// environment
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_environment(config::Environment::default().source(Some(source)))
    }

    fn from_environment(env: config::Environment) -> Result<Self, ConfigError> {
        let settings: Self = config::Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file (TOML, YAML, or JSON)
    ///
    /// The file format is auto-detected from the extension. Environment
    /// variables override file settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file doesn't exist
    /// - The file format is unsupported
    /// - The file contains invalid settings
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        use config::{Config, File, FileFormat};

        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => return Err(ConfigError::UnsupportedFormat),
        };

        let settings: Self = Config::builder()
            .add_source(File::new(
                path.to_str().ok_or(ConfigError::UnsupportedFormat)?,
                format,
            ))
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Create a settings builder for programmatic configuration
    pub fn builder() -> AuthSettingsBuilder {
        AuthSettingsBuilder::default()
    }

    /// Check that the provider settings are present
    ///
    /// A bypass-only development setup may leave them empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_disabled {
            return Ok(());
        }
        if self.keycloak_url.trim().is_empty() {
            return Err(ConfigError::MissingSetting("keycloak_url"));
        }
        if self.keycloak_realm.trim().is_empty() {
            return Err(ConfigError::MissingSetting("keycloak_realm"));
        }
        if self.keycloak_client_id.trim().is_empty() {
            return Err(ConfigError::MissingSetting("keycloak_client_id"));
        }
        Ok(())
    }

    /// Expected `iss` claim: `{keycloak_url}/realms/{realm}`
    pub fn issuer(&self) -> String {
        format!(
            "{}/realms/{}",
            self.keycloak_url.trim_end_matches('/'),
            self.keycloak_realm
        )
    }

    /// OIDC discovery document location for the realm
    pub fn discovery_url(&self) -> String {
        format!("{}/.well-known/openid-configuration", self.issuer())
    }

    /// Clock-skew tolerance as a duration
    pub fn leeway(&self) -> Duration {
        Duration::from_secs(self.leeway_secs)
    }

    /// Outbound request timeout as a duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Builder for [`AuthSettings`]
#[derive(Debug, Default)]
pub struct AuthSettingsBuilder {
    settings: AuthSettings,
}

impl AuthSettingsBuilder {
    /// Set the Keycloak base URL
    pub fn keycloak_url(mut self, url: impl Into<String>) -> Self {
        self.settings.keycloak_url = url.into();
        self
    }

    /// Set the realm
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.settings.keycloak_realm = realm.into();
        self
    }

    /// Set the client id
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.settings.keycloak_client_id = client_id.into();
        self
    }

    /// Enable or disable the development bypass
    pub fn auth_disabled(mut self, disabled: bool) -> Self {
        self.settings.auth_disabled = disabled;
        self
    }

    /// Set the `exp` clock-skew tolerance
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.settings.leeway_secs = leeway.as_secs();
        self
    }

    /// Set the outbound request timeout
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.settings.http_timeout_secs = timeout.as_secs();
        self
    }

    /// Validate and build the settings
    ///
    /// # Errors
    ///
    /// See [`AuthSettings::validate`].
    pub fn build(self) -> Result<AuthSettings, ConfigError> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
