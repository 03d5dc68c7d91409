//! Session-based authentication.
//!
//! # Spring Security Equivalent
//! `HttpSessionSecurityContextRepository` with session fixation protection.
//!
//! A successful login (form or OAuth2) stores a [`SessionUser`] in the
//! actix-session; every later request restores the principal from it.
//! Sessions older than the configured maximum age are discarded.
//!
//! # Example
//! ```rust,ignore
//! use actix_login_gate_core::http::security::session::{SessionAuthenticator, SessionConfig};
//! use actix_session::{storage::CookieSessionStore, SessionMiddleware};
//!
//! let config = SessionConfig::new().max_age(Duration::from_secs(30 * 60));
//!
//! App::new()
//!     .wrap(SecurityTransform::new()
//!         .config_authenticator(move || SessionAuthenticator::new(config.clone()))
//!         .config_authorizer(|| /* ... */))
//!     .wrap(SessionMiddleware::new(CookieSessionStore::default(), key))
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use actix_session::{Session, SessionExt};
use actix_web::dev::ServiceRequest;
use serde::{Deserialize, Serialize};

use crate::http::security::config::Authenticator;
use crate::http::security::User;

// =============================================================================
// Session Fixation Strategy
// =============================================================================

/// What happens to the session identifier when a principal logs in.
///
/// # Spring Security Equivalent
/// `SessionFixationProtectionStrategy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionFixationStrategy {
    /// Issue a new session id and keep the session attributes.
    #[default]
    MigrateSession,
    /// Issue a new session id and drop all attributes.
    NewSession,
    /// Keep the session id. Only for tests.
    None,
}

// =============================================================================
// Session User Data
// =============================================================================

/// The principal reference stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub username: String,
    pub roles: Vec<String>,
    /// Unix timestamp (seconds) of the login that created the session.
    pub established_at: u64,
}

impl SessionUser {
    /// Creates a session record for `user`, established now.
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.get_username().to_string(),
            roles: user.get_roles().to_vec(),
            established_at: unix_now(),
        }
    }

    /// Converts back to a principal. The password verifier is never stored.
    pub fn to_user(&self) -> User {
        User::without_password(&self.username).roles(&self.roles)
    }

    /// Returns true if the session is older than `max_age` at `now`.
    pub fn is_expired(&self, max_age: Duration, now: u64) -> bool {
        now.saturating_sub(self.established_at) > max_age.as_secs()
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Session authentication configuration.
///
/// # Spring Security Equivalent
/// `SessionManagementConfigurer`
#[derive(Debug, Clone)]
pub struct SessionConfig {
    user_key: String,
    saved_request_key: String,
    fixation_strategy: SessionFixationStrategy,
    max_age: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            user_key: "security_user".to_string(),
            saved_request_key: "security_saved_request".to_string(),
            fixation_strategy: SessionFixationStrategy::MigrateSession,
            max_age: None,
        }
    }

    /// Set the session key for the principal.
    pub fn user_key(mut self, key: &str) -> Self {
        self.user_key = key.to_string();
        self
    }

    /// Set the session key for the saved request URL.
    pub fn saved_request_key(mut self, key: &str) -> Self {
        self.saved_request_key = key.to_string();
        self
    }

    /// # Spring Equivalent
    /// `sessionManagement().sessionFixation().migrateSession()`
    pub fn fixation_strategy(mut self, strategy: SessionFixationStrategy) -> Self {
        self.fixation_strategy = strategy;
        self
    }

    /// Maximum lifetime of an authenticated session, counted from login.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn get_user_key(&self) -> &str {
        &self.user_key
    }

    pub fn get_saved_request_key(&self) -> &str {
        &self.saved_request_key
    }

    pub fn get_fixation_strategy(&self) -> SessionFixationStrategy {
        self.fixation_strategy
    }

    pub fn get_max_age(&self) -> Option<Duration> {
        self.max_age
    }
}

/// True for an absolute path on this host: a single leading `/` not
/// followed by `/` or `\`, and no control characters. Browsers strip tabs
/// and newlines, so `/\t/host` would become `//host`.
pub fn is_local_path(url: &str) -> bool {
    let bytes = url.as_bytes();
    bytes.first() == Some(&b'/')
        && !matches!(bytes.get(1), Some(b'/') | Some(b'\\'))
        && !url.chars().any(char::is_control)
}

// =============================================================================
// Session Authenticator
// =============================================================================

/// Reads and writes the authenticated principal in the actix-session.
///
/// # Requirements
/// `SessionMiddleware` must wrap the security middleware.
#[derive(Debug, Clone)]
pub struct SessionAuthenticator {
    config: SessionConfig,
}

impl SessionAuthenticator {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Establishes an authenticated session for `user`.
    ///
    /// Applies session fixation protection first. A session is bound to
    /// exactly one principal: logging in again replaces the previous one.
    pub fn login(session: &Session, user: &User, config: &SessionConfig) -> Result<(), SessionError> {
        match config.fixation_strategy {
            SessionFixationStrategy::MigrateSession => session.renew(),
            SessionFixationStrategy::NewSession => {
                session.purge();
                session.renew();
            }
            SessionFixationStrategy::None => {}
        }

        session
            .insert(&config.user_key, SessionUser::from_user(user))
            .map_err(|e| SessionError::InsertError(e.to_string()))?;

        tracing::debug!(username = %user.get_username(), "session established");
        Ok(())
    }

    /// Returns true if the session holds a live principal.
    pub fn is_authenticated(session: &Session, config: &SessionConfig) -> bool {
        Self::get_session_user(session, config).is_some()
    }

    /// Restores the principal from the session.
    ///
    /// Unreadable or expired records are removed and treated as absent.
    pub fn get_session_user(session: &Session, config: &SessionConfig) -> Option<User> {
        let record = match session.get::<SessionUser>(&config.user_key) {
            Ok(record) => record?,
            Err(e) => {
                tracing::debug!(error = %e, "discarding unreadable session record");
                session.remove(&config.user_key);
                return None;
            }
        };

        if let Some(max_age) = config.max_age {
            if record.is_expired(max_age, unix_now()) {
                tracing::debug!(username = %record.username, "session expired");
                session.remove(&config.user_key);
                return None;
            }
        }

        Some(record.to_user())
    }

    /// Remembers the URL a challenged request was heading to.
    ///
    /// # Spring Equivalent
    /// `HttpSessionRequestCache.saveRequest`
    ///
    /// Only local paths are saved; anything a browser could read as another
    /// host is ignored.
    pub fn save_request(session: &Session, url: &str, config: &SessionConfig) -> Result<(), SessionError> {
        if !is_local_path(url) {
            tracing::debug!(url = %url, "not saving non-local request");
            return Ok(());
        }
        session
            .insert(&config.saved_request_key, url)
            .map_err(|e| SessionError::InsertError(e.to_string()))
    }

    /// Takes the saved URL out of the session, or returns `default_url`.
    ///
    /// A saved value that is not a local path is dropped.
    pub fn get_saved_request(session: &Session, config: &SessionConfig, default_url: &str) -> String {
        let saved = session
            .get::<String>(&config.saved_request_key)
            .ok()
            .flatten();

        if saved.is_some() {
            session.remove(&config.saved_request_key);
        }

        saved
            .filter(|url| is_local_path(url))
            .unwrap_or_else(|| default_url.to_string())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Authenticator for SessionAuthenticator {
    fn get_user(&self, req: &ServiceRequest) -> Option<User> {
        let session = req.get_session();
        Self::get_session_user(&session, &self.config)
    }
}

// =============================================================================
// Session Error
// =============================================================================

/// Session-related errors.
#[derive(Debug)]
pub enum SessionError {
    /// Error writing data into the session
    InsertError(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InsertError(e) => write!(f, "Session insert error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn test_user() -> User {
        User::with_encoded_password("testuser", "{noop}password".to_string()).roles(&["USER".into()])
    }

    #[test]
    fn test_session_user_conversion() {
        let session_user = SessionUser::from_user(&test_user());

        assert_eq!(session_user.username, "testuser");
        assert!(session_user.roles.contains(&"USER".to_string()));
        assert!(session_user.established_at > 0);

        let restored = session_user.to_user();
        assert_eq!(restored.get_username(), "testuser");
        assert!(restored.has_role("USER"));
        assert!(!restored.has_password());
    }

    #[test]
    fn test_session_user_serialization_skips_password() {
        let json = serde_json::to_string(&SessionUser::from_user(&test_user())).unwrap();
        assert!(json.contains("testuser"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn test_session_expiry() {
        let record = SessionUser {
            username: "user".into(),
            roles: vec![],
            established_at: 1_000,
        };
        let max_age = Duration::from_secs(60);

        assert!(!record.is_expired(max_age, 1_000));
        assert!(!record.is_expired(max_age, 1_060));
        assert!(record.is_expired(max_age, 1_061));
        // clock moved backwards
        assert!(!record.is_expired(max_age, 10));
    }

    #[test]
    fn test_is_local_path() {
        for url in ["/", "/dashboard", "/dashboard?tab=1", "/a//b"] {
            assert!(is_local_path(url), "{url}");
        }
        for url in [
            "",
            "dashboard",
            "//evil.example/phish",
            "/\\evil.example",
            "/\t/evil.example",
            "https://evil.example/",
        ] {
            assert!(!is_local_path(url), "{url}");
        }
    }

    #[test]
    fn test_saved_request_must_be_local() {
        let session = TestRequest::default().to_srv_request().get_session();
        let config = SessionConfig::new();

        SessionAuthenticator::save_request(&session, "//evil.example/phish", &config).unwrap();
        assert_eq!(SessionAuthenticator::get_saved_request(&session, &config, "/"), "/");

        // a foreign value already in the session is not followed either
        session
            .insert(config.get_saved_request_key(), "//evil.example/phish")
            .unwrap();
        assert_eq!(SessionAuthenticator::get_saved_request(&session, &config, "/"), "/");
        assert!(session
            .get::<String>(config.get_saved_request_key())
            .unwrap()
            .is_none());

        SessionAuthenticator::save_request(&session, "/dashboard?tab=1", &config).unwrap();
        assert_eq!(
            SessionAuthenticator::get_saved_request(&session, &config, "/"),
            "/dashboard?tab=1"
        );
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new()
            .user_key("user")
            .saved_request_key("saved")
            .fixation_strategy(SessionFixationStrategy::NewSession)
            .max_age(Duration::from_secs(3600));

        assert_eq!(config.get_user_key(), "user");
        assert_eq!(config.get_saved_request_key(), "saved");
        assert_eq!(config.get_fixation_strategy(), SessionFixationStrategy::NewSession);
        assert_eq!(config.get_max_age(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.get_fixation_strategy(), SessionFixationStrategy::MigrateSession);
        assert_eq!(config.get_max_age(), None);
    }
}
