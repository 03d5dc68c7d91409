//! The application's security configuration.
//!
//! # Spring Equivalent
//! A `@Configuration @EnableWebSecurity` class declaring a
//! `UserDetailsService` bean and a `SecurityFilterChain` bean:
//!
//! ```java
//! http.authorizeHttpRequests(r -> r.requestMatchers("/", "/login").permitAll()
//!                                  .anyRequest().authenticated())
//!     .formLogin(withDefaults())
//!     .oauth2Login(withDefaults());
//! ```

use std::sync::Arc;

use actix_login_gate_core::http::security::oauth2::{
    OAuth2ClientRepository, OAuth2Error, OAuth2LoginService, OAuth2UserMapper,
};
use actix_login_gate_core::http::security::{
    AccessPolicy, AuthenticationManager, AuthorizationManager, CredentialStore,
    DelegatingPasswordEncoder, FormLoginConfig, FormLoginHandler, FormLoginService,
    InMemoryCredentialStore, LoginEndpoints, PasswordEncoder, PasswordEncodingError, RequestGate,
    RouteRules, SecurityTransform, SessionAuthenticator, SessionConfig, User,
};
use actix_session::config::PersistentSession;
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::{time, Key};
use derive_more::{Display, Error};

use crate::settings::Settings;

/// The one principal this application knows.
///
/// # Spring Equivalent
/// `User.withDefaultPasswordEncoder().username("user").password("password").roles("USER")`
pub fn user_details_service() -> Result<InMemoryCredentialStore, PasswordEncodingError> {
    let encoder = DelegatingPasswordEncoder::new();
    let user = User::with_encoded_password("user", encoder.encode("password")?)
        .roles(&["USER".to_string()]);

    Ok(AuthenticationManager::in_memory_authentication()
        .password_encoder(encoder)?
        .with_user(user))
}

/// `/` and `/login` are public; everything else needs a session.
pub fn request_gate(session: SessionConfig) -> RequestGate {
    AuthorizationManager::request_gate()
        .rules(
            RouteRules::new()
                .permit_all(&["/", "/login"])
                .any_request(AccessPolicy::Authenticated),
        )
        .login_url("/login")
        .save_requests(session)
}

/// Startup failures of [`SecurityConfig::new`].
#[derive(Debug, Display, Error)]
pub enum SecurityConfigError {
    #[display("cannot build the credential store: {source}")]
    Credentials { source: PasswordEncodingError },
    #[display("invalid oauth2 registration: {source}")]
    OAuth2 { source: OAuth2Error },
}

impl From<PasswordEncodingError> for SecurityConfigError {
    fn from(source: PasswordEncodingError) -> Self {
        SecurityConfigError::Credentials { source }
    }
}

impl From<OAuth2Error> for SecurityConfigError {
    fn from(source: OAuth2Error) -> Self {
        SecurityConfigError::OAuth2 { source }
    }
}

/// Everything the middleware pipeline and the login endpoints need.
#[derive(Clone)]
pub struct SecurityConfig {
    session: SessionConfig,
    gate: RequestGate,
    endpoints: LoginEndpoints,
    cookie_secure: bool,
}

impl SecurityConfig {
    /// Builds the configuration. Broken OAuth2 registrations and a failing
    /// password encoder are reported here, before the server starts.
    pub fn new(settings: &Settings) -> Result<Self, SecurityConfigError> {
        let store: Arc<dyn CredentialStore> = Arc::new(user_details_service()?);
        let session = SessionConfig::new().max_age(settings.session_max_age());

        let form_login_config = FormLoginConfig::new();
        let form_login =
            FormLoginService::new(Arc::clone(&store), form_login_config.clone(), session.clone());
        let mut endpoints = LoginEndpoints::new(form_login);

        let repository =
            OAuth2ClientRepository::from_configs(settings.oauth2_configs(), settings.oauth2_timeout())?;
        if !repository.is_empty() {
            tracing::info!(registrations = ?repository.registration_ids(), "oauth2 login enabled");
            let oauth2_login = OAuth2LoginService::new(
                Arc::new(repository),
                OAuth2UserMapper::new(settings.oauth2.user_mapping, store),
                FormLoginHandler::new(form_login_config, session.clone()),
            );
            endpoints = endpoints.oauth2(oauth2_login);
        }

        Ok(SecurityConfig {
            gate: request_gate(session.clone()),
            session,
            endpoints,
            cookie_secure: settings.session.cookie_secure,
        })
    }

    pub fn endpoints(&self) -> &LoginEndpoints {
        &self.endpoints
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    /// The security filter chain.
    pub fn security_transform(&self) -> SecurityTransform<SessionAuthenticator, RequestGate> {
        let session = self.session.clone();
        let gate = self.gate.clone();

        SecurityTransform::new()
            .authentication_endpoints(self.endpoints.endpoint_patterns())
            .config_authenticator(move || SessionAuthenticator::new(session.clone()))
            .config_authorizer(move || gate.clone())
    }

    /// Cookie-backed session storage. Must wrap the security transform.
    pub fn session_middleware(&self, key: Key) -> SessionMiddleware<CookieSessionStore> {
        let mut builder = SessionMiddleware::builder(CookieSessionStore::default(), key)
            .cookie_secure(self.cookie_secure);

        if let Some(max_age) = self.session.get_max_age() {
            let ttl = time::Duration::seconds(i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX));
            builder = builder.session_lifecycle(PersistentSession::default().session_ttl(ttl));
        }

        builder.build()
    }
}
