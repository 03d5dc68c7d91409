//! Form-based Login Authentication.
//!
//! # Spring Security Equivalent
//! `formLogin()` with its defaults: login page `GET /login`, processing URL
//! `POST /login`, failure URL `/login?error`, success to the saved request
//! or `/`.
//!
//! # Example
//! ```rust,ignore
//! use actix_login_gate_core::http::security::form_login::{FormLoginConfig, FormLoginService};
//!
//! let form_login = FormLoginService::new(
//!     Arc::new(store),
//!     FormLoginConfig::new().default_success_url("/dashboard"),
//!     SessionConfig::new(),
//! );
//! ```

use std::sync::Arc;

use actix_session::Session;
use actix_web::http::header::LOCATION;
use actix_web::HttpResponse;
use serde::Deserialize;

use crate::http::security::credentials::CredentialStore;
use crate::http::security::session::{SessionAuthenticator, SessionConfig};
use crate::http::security::User;

// =============================================================================
// Form Login Configuration
// =============================================================================

/// Form login configuration.
///
/// # Spring Security Equivalent
/// `FormLoginConfigurer`
#[derive(Debug, Clone)]
pub struct FormLoginConfig {
    /// URL of the login page (GET)
    login_page: String,
    /// URL that processes the login form (POST)
    login_processing_url: String,
    /// Default URL after successful login
    default_success_url: String,
    /// Ignore the saved request
    always_use_default_success_url: bool,
    /// URL after failed login
    failure_url: String,
}

impl Default for FormLoginConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FormLoginConfig {
    pub fn new() -> Self {
        Self {
            login_page: "/login".to_string(),
            login_processing_url: "/login".to_string(),
            default_success_url: "/".to_string(),
            always_use_default_success_url: false,
            failure_url: "/login?error".to_string(),
        }
    }

    /// # Spring Equivalent
    /// `formLogin().loginPage("/login")`
    pub fn login_page(mut self, url: &str) -> Self {
        self.login_page = url.to_string();
        self
    }

    /// # Spring Equivalent
    /// `formLogin().loginProcessingUrl("/login")`
    pub fn login_processing_url(mut self, url: &str) -> Self {
        self.login_processing_url = url.to_string();
        self
    }

    /// # Spring Equivalent
    /// `formLogin().defaultSuccessUrl("/")`
    pub fn default_success_url(mut self, url: &str) -> Self {
        self.default_success_url = url.to_string();
        self
    }

    /// # Spring Equivalent
    /// `formLogin().defaultSuccessUrl("/", true)`
    pub fn always_use_default_success_url(mut self, always: bool) -> Self {
        self.always_use_default_success_url = always;
        self
    }

    /// # Spring Equivalent
    /// `formLogin().failureUrl("/login?error")`
    pub fn failure_url(mut self, url: &str) -> Self {
        self.failure_url = url.to_string();
        self
    }

    pub fn get_login_page(&self) -> &str {
        &self.login_page
    }

    pub fn get_login_processing_url(&self) -> &str {
        &self.login_processing_url
    }

    pub fn get_default_success_url(&self) -> &str {
        &self.default_success_url
    }

    pub fn is_always_use_default_success_url(&self) -> bool {
        self.always_use_default_success_url
    }

    pub fn get_failure_url(&self) -> &str {
        &self.failure_url
    }
}

// =============================================================================
// Login Form Data
// =============================================================================

/// The submitted login form.
#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"[PROTECTED]")
            .finish()
    }
}

// =============================================================================
// Form Login Handler
// =============================================================================

/// Turns authentication outcomes into redirects.
///
/// # Spring Security Equivalent
/// `SavedRequestAwareAuthenticationSuccessHandler` +
/// `SimpleUrlAuthenticationFailureHandler`
#[derive(Debug, Clone)]
pub struct FormLoginHandler {
    config: FormLoginConfig,
    session_config: SessionConfig,
}

impl FormLoginHandler {
    pub fn new(config: FormLoginConfig, session_config: SessionConfig) -> Self {
        Self {
            config,
            session_config,
        }
    }

    /// Establishes the session, then redirects to the saved request or the
    /// default success URL.
    ///
    /// A session that cannot be written counts as a failed login.
    pub fn on_authentication_success(&self, session: &Session, user: &User) -> HttpResponse {
        if let Err(e) = SessionAuthenticator::login(session, user, &self.session_config) {
            tracing::warn!(error = %e, username = %user.get_username(), "could not establish session");
            return self.on_authentication_failure();
        }

        let redirect_url = if self.config.always_use_default_success_url {
            self.config.default_success_url.clone()
        } else {
            SessionAuthenticator::get_saved_request(
                session,
                &self.session_config,
                &self.config.default_success_url,
            )
        };

        HttpResponse::Found()
            .insert_header((LOCATION, redirect_url))
            .finish()
    }

    /// Redirects back to the login page with the error indicator.
    pub fn on_authentication_failure(&self) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((LOCATION, self.config.failure_url.clone()))
            .finish()
    }

    pub fn config(&self) -> &FormLoginConfig {
        &self.config
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }
}

// =============================================================================
// Form Login Service
// =============================================================================

/// Credential check plus session establishment for form submissions.
///
/// # Spring Security Equivalent
/// `UsernamePasswordAuthenticationFilter`
#[derive(Clone)]
pub struct FormLoginService<C: CredentialStore = Arc<dyn CredentialStore>> {
    store: C,
    handler: FormLoginHandler,
}

impl<C: CredentialStore> FormLoginService<C> {
    pub fn new(store: C, config: FormLoginConfig, session_config: SessionConfig) -> Self {
        Self {
            store,
            handler: FormLoginHandler::new(config, session_config),
        }
    }

    /// Verifies the credentials and answers with the matching redirect.
    ///
    /// Unknown usernames and wrong passwords produce the same response.
    pub fn attempt_authentication(&self, session: &Session, username: &str, password: &str) -> HttpResponse {
        match self.store.authenticate(username, password) {
            Some(user) => {
                tracing::info!(username = %user.get_username(), "form login succeeded");
                self.handler.on_authentication_success(session, &user)
            }
            None => {
                tracing::warn!(username = %username, "form login failed");
                self.handler.on_authentication_failure()
            }
        }
    }

    pub fn attempt_authentication_with_form(&self, session: &Session, form: &LoginForm) -> HttpResponse {
        self.attempt_authentication(session, &form.username, &form.password)
    }

    /// Answers a submission that could not be parsed.
    pub fn reject_malformed(&self) -> HttpResponse {
        tracing::warn!("malformed login form submission");
        self.handler.on_authentication_failure()
    }

    pub fn handler(&self) -> &FormLoginHandler {
        &self.handler
    }

    pub fn store(&self) -> &C {
        &self.store
    }
}
