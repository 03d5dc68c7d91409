//! Application settings.
//!
//! Loaded from an optional TOML file; every value has a default except the
//! OAuth2 registrations, which must be complete when present.
//!
//! ```toml
//! bind = "127.0.0.1:8080"
//!
//! [session]
//! key_base64 = "..."        # at least 64 bytes once decoded
//! max_age_secs = 1800
//!
//! [oauth2]
//! timeout_secs = 10
//! user_mapping = "provider_scoped"
//!
//! [oauth2.registrations.github]
//! provider = "github"
//! client_id = "..."
//! client_secret = "..."
//! redirect_uri = "http://localhost:8080/login/oauth2/code/github"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use actix_login_gate_core::http::security::oauth2::{OAuth2Config, OAuth2Provider, OAuth2UserMapping};
use actix_web::cookie::Key;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use derive_more::{Display, Error};
use serde::Deserialize;

/// Minimum signing and encryption key length accepted by the session cookie.
pub const MIN_SESSION_KEY_LEN: usize = 64;

#[derive(Debug, Display, Error)]
pub enum SettingsError {
    #[display("cannot read {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[display("cannot parse {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
    #[display("invalid settings: {reason}")]
    Invalid { reason: String },
}

impl SettingsError {
    fn invalid(reason: impl Into<String>) -> Self {
        SettingsError::Invalid {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Address the HTTP server listens on
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub oauth2: OAuth2Settings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Cookie signing and encryption key, base64 encoded. A random key is
    /// generated when absent, which logs everybody out on restart.
    #[serde(default)]
    pub key_base64: Option<String>,

    /// Lifetime of an authenticated session
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,

    /// Only send the session cookie over HTTPS
    #[serde(default)]
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2Settings {
    /// Bound on the provider round trip at callback time
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub user_mapping: OAuth2UserMapping,

    /// Client registrations keyed by registration id
    #[serde(default)]
    pub registrations: BTreeMap<String, RegistrationSettings>,
}

#[derive(Clone, Deserialize)]
pub struct RegistrationSettings {
    /// Defaults to the provider whose name is the registration id, else custom
    #[serde(default)]
    pub provider: Option<OAuth2Provider>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default)]
    pub authorization_uri: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub userinfo_uri: Option<String>,
    #[serde(default)]
    pub user_name_attribute: Option<String>,
    #[serde(default)]
    pub use_pkce: Option<bool>,
}

impl std::fmt::Debug for RegistrationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationSettings")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[PROTECTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_age_secs() -> u64 {
    30 * 60
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            session: SessionSettings::default(),
            oauth2: OAuth2Settings::default(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            key_base64: None,
            max_age_secs: default_max_age_secs(),
            cookie_secure: false,
        }
    }
}

impl Default for OAuth2Settings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_mapping: OAuth2UserMapping::default(),
            registrations: BTreeMap::new(),
        }
    }
}

/// Values taken from the command line or the environment. Each one that is
/// set replaces the value from the file.
#[derive(Clone, Default)]
pub struct SettingsOverrides {
    pub bind: Option<String>,
    pub session_key_base64: Option<String>,
    pub session_max_age_secs: Option<u64>,
    pub cookie_secure: Option<bool>,
    pub oauth2_timeout_secs: Option<u64>,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn apply_overrides(&mut self, overrides: SettingsOverrides) {
        if let Some(bind) = overrides.bind {
            self.bind = bind;
        }
        if let Some(key) = overrides.session_key_base64 {
            self.session.key_base64 = Some(key);
        }
        if let Some(max_age) = overrides.session_max_age_secs {
            self.session.max_age_secs = max_age;
        }
        if let Some(secure) = overrides.cookie_secure {
            self.session.cookie_secure = secure;
        }
        if let Some(timeout) = overrides.oauth2_timeout_secs {
            self.oauth2.timeout_secs = timeout;
        }
    }

    /// Checks everything that would otherwise fail on the first request.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.session.max_age_secs == 0 {
            return Err(SettingsError::invalid("session.max_age_secs must be positive"));
        }
        if self.oauth2.timeout_secs == 0 {
            return Err(SettingsError::invalid("oauth2.timeout_secs must be positive"));
        }
        if let Some(key) = &self.session.key_base64 {
            decode_session_key(key)?;
        }
        for config in self.oauth2_configs() {
            config
                .validate()
                .map_err(|e| SettingsError::invalid(e.to_string()))?;
        }
        Ok(())
    }

    /// The configured session key, or a fresh random one.
    pub fn session_key(&self) -> Result<Key, SettingsError> {
        match &self.session.key_base64 {
            Some(key) => decode_session_key(key),
            None => {
                tracing::warn!("no session key configured, generating a random one");
                Ok(Key::generate())
            }
        }
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session.max_age_secs)
    }

    pub fn oauth2_timeout(&self) -> Duration {
        Duration::from_secs(self.oauth2.timeout_secs)
    }

    /// Client registrations in registration id order.
    pub fn oauth2_configs(&self) -> Vec<OAuth2Config> {
        self.oauth2
            .registrations
            .iter()
            .map(|(id, registration)| registration.to_config(id))
            .collect()
    }
}

fn decode_session_key(encoded: &str) -> Result<Key, SettingsError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| SettingsError::invalid(format!("session.key_base64: {}", e)))?;
    if bytes.len() < MIN_SESSION_KEY_LEN {
        return Err(SettingsError::invalid(format!(
            "session.key_base64 must decode to at least {} bytes, got {}",
            MIN_SESSION_KEY_LEN,
            bytes.len()
        )));
    }
    Key::try_from(bytes.as_slice())
        .map_err(|e| SettingsError::invalid(format!("session.key_base64: {}", e)))
}

impl RegistrationSettings {
    fn provider_for(&self, registration_id: &str) -> OAuth2Provider {
        self.provider.unwrap_or(match registration_id {
            "github" => OAuth2Provider::GitHub,
            "google" => OAuth2Provider::Google,
            "facebook" => OAuth2Provider::Facebook,
            _ => OAuth2Provider::Custom,
        })
    }

    /// Provider defaults first, explicit settings on top.
    pub fn to_config(&self, registration_id: &str) -> OAuth2Config {
        let mut config = OAuth2Config::new(
            self.client_id.clone(),
            self.client_secret.clone(),
            self.redirect_uri.clone(),
        )
        .registration_id(registration_id)
        .provider(self.provider_for(registration_id));

        if let Some(name) = &self.client_name {
            config = config.client_name(name.clone());
        }
        if let Some(scopes) = &self.scopes {
            config = config.scopes(scopes.clone());
        }
        if let Some(uri) = &self.authorization_uri {
            config = config.authorization_uri(uri.clone());
        }
        if let Some(uri) = &self.token_uri {
            config = config.token_uri(uri.clone());
        }
        if let Some(uri) = &self.userinfo_uri {
            config = config.userinfo_uri(uri.clone());
        }
        if let Some(attribute) = &self.user_name_attribute {
            config = config.user_name_attribute(attribute.clone());
        }
        if let Some(use_pkce) = self.use_pkce {
            config = config.use_pkce(use_pkce);
        }
        config
    }
}
