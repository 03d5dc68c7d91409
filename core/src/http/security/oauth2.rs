//! OAuth2 Login
//!
//! Authorization code login against external identity providers, the
//! equivalent of Spring Security's `oauth2Login()`.
//!
//! # Flow
//!
//! 1. `GET /oauth2/authorization/{registration_id}` stores an
//!    [`AuthorizationRequestState`] in the session and redirects to the
//!    provider's authorization endpoint.
//! 2. The provider redirects back to `GET /login/oauth2/code/{registration_id}`.
//!    The state is checked, the code is exchanged for an access token and
//!    the user-info endpoint is read, all under one timeout.
//! 3. The provider identity is mapped to a local [`User`] by the
//!    [`OAuth2UserMapper`] and a session is established.
//!
//! Any failure redirects to the login page with the error indicator and
//! never creates a session.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use actix_login_gate_core::http::security::oauth2::{
//!     OAuth2Config, OAuth2Provider, OAuth2ClientRepository
//! };
//!
//! let github = OAuth2Config::new(
//!     "your-client-id",
//!     "your-client-secret",
//!     "http://localhost:8080/login/oauth2/code/github"
//! )
//! .provider(OAuth2Provider::GitHub);
//!
//! let repository = OAuth2ClientRepository::from_configs(vec![github], Duration::from_secs(10))?;
//! ```
//!
//! # Spring Security Comparison
//!
//! | Spring Security | Actix Login Gate |
//! |-----------------|------------------|
//! | `ClientRegistration` | `OAuth2Config` |
//! | `ClientRegistrationRepository` | `OAuth2ClientRepository` |
//! | `OAuth2AuthorizationRequest` | `AuthorizationRequestState` |
//! | `OAuth2User` | `OAuth2User` |
//! | `OAuth2UserService` | `OAuth2UserMapper` |
//! | `OAuth2LoginAuthenticationFilter` | `OAuth2LoginService` |

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use actix_session::Session;
use actix_web::http::header::LOCATION;
use actix_web::HttpResponse;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::url::Url;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};

use crate::http::security::credentials::CredentialStore;
use crate::http::security::form_login::FormLoginHandler;
use crate::http::security::login_page::ProviderLink;
use crate::http::security::session::unix_now;
use crate::http::security::user::User;

/// Session key of the pending authorization request.
pub const AUTHORIZATION_REQUEST_KEY: &str = "oauth2_authorization_request";

/// Role given to principals created by [`OAuth2UserMapping::ProviderScoped`].
pub const OAUTH2_USER_ROLE: &str = "OAUTH2_USER";

/// OAuth2 error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuth2Error {
    /// Incomplete or invalid client registration
    Configuration(String),
    /// No client registered under this id
    UnknownRegistration(String),
    /// The provider answered the authorization request with an error
    Provider(String),
    /// Missing, mismatched or stale state
    InvalidState(String),
    /// The callback carried no authorization code
    MissingCode,
    /// Token exchange failed
    TokenExchange(String),
    /// User info retrieval failed
    UserInfo(String),
    /// The provider round trip took longer than the configured timeout
    Timeout,
    /// The provider identity has no local principal
    UnknownPrincipal(String),
}

impl fmt::Display for OAuth2Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OAuth2Error::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            OAuth2Error::UnknownRegistration(id) => write!(f, "Unknown client registration: {}", id),
            OAuth2Error::Provider(msg) => write!(f, "Provider error: {}", msg),
            OAuth2Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            OAuth2Error::MissingCode => write!(f, "Missing authorization code"),
            OAuth2Error::TokenExchange(msg) => write!(f, "Token exchange error: {}", msg),
            OAuth2Error::UserInfo(msg) => write!(f, "User info error: {}", msg),
            OAuth2Error::Timeout => write!(f, "Provider request timed out"),
            OAuth2Error::UnknownPrincipal(name) => write!(f, "No local principal for {}", name),
        }
    }
}

impl std::error::Error for OAuth2Error {}

// =============================================================================
// Providers and Client Registrations
// =============================================================================

/// Common OAuth2 providers with pre-configured endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuth2Provider {
    /// Google OAuth2
    Google,
    /// GitHub OAuth2
    GitHub,
    /// Facebook OAuth2
    Facebook,
    /// Custom provider (requires manual configuration)
    Custom,
}

impl OAuth2Provider {
    /// Get the authorization endpoint for this provider
    pub fn auth_url(&self) -> Option<&'static str> {
        match self {
            OAuth2Provider::Google => Some("https://accounts.google.com/o/oauth2/v2/auth"),
            OAuth2Provider::GitHub => Some("https://github.com/login/oauth/authorize"),
            OAuth2Provider::Facebook => Some("https://www.facebook.com/v18.0/dialog/oauth"),
            OAuth2Provider::Custom => None,
        }
    }

    /// Get the token endpoint for this provider
    pub fn token_url(&self) -> Option<&'static str> {
        match self {
            OAuth2Provider::Google => Some("https://oauth2.googleapis.com/token"),
            OAuth2Provider::GitHub => Some("https://github.com/login/oauth/access_token"),
            OAuth2Provider::Facebook => Some("https://graph.facebook.com/v18.0/oauth/access_token"),
            OAuth2Provider::Custom => None,
        }
    }

    /// Get the user info endpoint for this provider
    pub fn userinfo_url(&self) -> Option<&'static str> {
        match self {
            OAuth2Provider::Google => Some("https://www.googleapis.com/oauth2/v3/userinfo"),
            OAuth2Provider::GitHub => Some("https://api.github.com/user"),
            OAuth2Provider::Facebook => Some("https://graph.facebook.com/me?fields=id,name,email"),
            OAuth2Provider::Custom => None,
        }
    }

    /// Get default scopes for this provider
    pub fn default_scopes(&self) -> Vec<&'static str> {
        match self {
            OAuth2Provider::Google => vec!["openid", "profile", "email"],
            OAuth2Provider::GitHub => vec!["read:user"],
            OAuth2Provider::Facebook => vec!["public_profile", "email"],
            OAuth2Provider::Custom => vec![],
        }
    }

    /// User-info attribute holding the provider's stable user id.
    pub fn user_name_attribute(&self) -> &'static str {
        match self {
            OAuth2Provider::Google => "sub",
            OAuth2Provider::GitHub => "id",
            OAuth2Provider::Facebook => "id",
            OAuth2Provider::Custom => "sub",
        }
    }

    /// Name shown on the login page.
    pub fn client_name(&self) -> Option<&'static str> {
        match self {
            OAuth2Provider::Google => Some("Google"),
            OAuth2Provider::GitHub => Some("GitHub"),
            OAuth2Provider::Facebook => Some("Facebook"),
            OAuth2Provider::Custom => None,
        }
    }

    /// GitHub and Facebook reject PKCE parameters.
    pub fn supports_pkce(&self) -> bool {
        !matches!(self, OAuth2Provider::GitHub | OAuth2Provider::Facebook)
    }
}

/// OAuth2 configuration for a client registration
///
/// Similar to Spring Security's `ClientRegistration`.
///
/// # Example
///
/// ```
/// use actix_login_gate_core::http::security::oauth2::{OAuth2Config, OAuth2Provider};
///
/// let config = OAuth2Config::new(
///     "client-id",
///     "client-secret",
///     "http://localhost:8080/login/oauth2/code/github"
/// )
/// .provider(OAuth2Provider::GitHub);
///
/// assert_eq!(config.registration_id, "github");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct OAuth2Config {
    /// Registration ID (e.g., "google", "github")
    pub registration_id: String,
    /// Name shown on the login page
    pub client_name: String,
    /// OAuth2 client ID
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Redirect URI for callbacks
    pub redirect_uri: String,
    /// OAuth2 provider
    pub provider: OAuth2Provider,
    /// Authorization endpoint URL
    pub authorization_uri: Option<String>,
    /// Token endpoint URL
    pub token_uri: Option<String>,
    /// User info endpoint URL
    pub userinfo_uri: Option<String>,
    /// OAuth2 scopes
    pub scopes: Vec<String>,
    /// Use PKCE (Proof Key for Code Exchange)
    pub use_pkce: bool,
    /// User-info attribute naming the user
    pub user_name_attribute: String,
}

impl OAuth2Config {
    /// Create a new OAuth2 configuration for a custom provider
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            registration_id: String::new(),
            client_name: String::new(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            provider: OAuth2Provider::Custom,
            authorization_uri: None,
            token_uri: None,
            userinfo_uri: None,
            scopes: Vec::new(),
            use_pkce: true,
            user_name_attribute: OAuth2Provider::Custom.user_name_attribute().to_string(),
        }
    }

    /// Set the registration ID
    pub fn registration_id(mut self, id: impl Into<String>) -> Self {
        self.registration_id = id.into();
        self
    }

    pub fn client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    /// Set the OAuth2 provider
    ///
    /// Fills in the provider's endpoints, scopes, user-name attribute and
    /// PKCE support. Explicit settings made afterwards take precedence.
    pub fn provider(mut self, provider: OAuth2Provider) -> Self {
        self.provider = provider;
        if self.registration_id.is_empty() {
            self.registration_id = format!("{:?}", provider).to_lowercase();
        }
        if let Some(name) = provider.client_name() {
            self.client_name = name.to_string();
        }

        if let Some(auth_url) = provider.auth_url() {
            self.authorization_uri = Some(auth_url.to_string());
        }
        if let Some(token_url) = provider.token_url() {
            self.token_uri = Some(token_url.to_string());
        }
        if let Some(userinfo_url) = provider.userinfo_url() {
            self.userinfo_uri = Some(userinfo_url.to_string());
        }

        if self.scopes.is_empty() {
            self.scopes = provider
                .default_scopes()
                .into_iter()
                .map(String::from)
                .collect();
        }

        self.user_name_attribute = provider.user_name_attribute().to_string();
        self.use_pkce = provider.supports_pkce();
        self
    }

    /// Set the authorization endpoint URL
    pub fn authorization_uri(mut self, uri: impl Into<String>) -> Self {
        self.authorization_uri = Some(uri.into());
        self
    }

    /// Set the token endpoint URL
    pub fn token_uri(mut self, uri: impl Into<String>) -> Self {
        self.token_uri = Some(uri.into());
        self
    }

    /// Set the user info endpoint URL
    pub fn userinfo_uri(mut self, uri: impl Into<String>) -> Self {
        self.userinfo_uri = Some(uri.into());
        self
    }

    /// Set the OAuth2 scopes
    pub fn scopes(mut self, scopes: Vec<impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Add a scope
    pub fn add_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Enable or disable PKCE
    pub fn use_pkce(mut self, use_pkce: bool) -> Self {
        self.use_pkce = use_pkce;
        self
    }

    /// Set the attribute name used for extracting the user name
    pub fn user_name_attribute(mut self, attr: impl Into<String>) -> Self {
        self.user_name_attribute = attr.into();
        self
    }

    /// Name for the login page, falling back to the registration id.
    pub fn display_name(&self) -> &str {
        if self.client_name.is_empty() {
            &self.registration_id
        } else {
            &self.client_name
        }
    }

    /// Checks that the registration is complete.
    ///
    /// Called when clients are built so a broken registration stops the
    /// application at startup.
    pub fn validate(&self) -> Result<(), OAuth2Error> {
        let missing = |what: &str| {
            OAuth2Error::Configuration(format!(
                "registration '{}': missing {}",
                self.registration_id, what
            ))
        };

        if self.registration_id.trim().is_empty() {
            return Err(OAuth2Error::Configuration("missing registration id".to_string()));
        }
        if self.client_id.trim().is_empty() {
            return Err(missing("client id"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(missing("client secret"));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(missing("redirect uri"));
        }
        if self.user_name_attribute.trim().is_empty() {
            return Err(missing("user name attribute"));
        }

        for (what, uri) in [
            ("redirect uri", Some(&self.redirect_uri)),
            ("authorization uri", self.authorization_uri.as_ref()),
            ("token uri", self.token_uri.as_ref()),
            ("userinfo uri", self.userinfo_uri.as_ref()),
        ] {
            let uri = uri.ok_or_else(|| missing(what))?;
            Url::parse(uri).map_err(|e| {
                OAuth2Error::Configuration(format!(
                    "registration '{}': invalid {} '{}': {}",
                    self.registration_id, what, uri, e
                ))
            })?;
        }

        Ok(())
    }
}

impl fmt::Debug for OAuth2Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Config")
            .field("registration_id", &self.registration_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[PROTECTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("provider", &self.provider)
            .field("authorization_uri", &self.authorization_uri)
            .field("token_uri", &self.token_uri)
            .field("userinfo_uri", &self.userinfo_uri)
            .field("scopes", &self.scopes)
            .field("use_pkce", &self.use_pkce)
            .field("user_name_attribute", &self.user_name_attribute)
            .finish()
    }
}

// =============================================================================
// Provider Identity
// =============================================================================

/// User information retrieved from an OAuth2 provider
#[derive(Debug, Clone, PartialEq)]
pub struct OAuth2User {
    /// Registration that authenticated this user
    pub registration_id: String,
    /// Value of the registration's user-name attribute
    pub name: String,
    /// All user-info attributes
    pub attributes: HashMap<String, serde_json::Value>,
}

impl OAuth2User {
    /// Builds a user from a user-info document.
    pub fn from_attributes(
        registration_id: &str,
        user_name_attribute: &str,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Result<Self, OAuth2Error> {
        let name = match attributes.get(user_name_attribute) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                return Err(OAuth2Error::UserInfo(format!(
                    "missing attribute '{}'",
                    user_name_attribute
                )))
            }
        };

        Ok(Self {
            registration_id: registration_id.to_string(),
            name,
            attributes,
        })
    }

    /// Get a specific attribute value
    pub fn get_attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}

/// How a provider identity becomes a local principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuth2UserMapping {
    /// Every provider identity is a principal of its own, named
    /// `{registration_id}:{name}`, with the `OAUTH2_USER` role.
    #[default]
    ProviderScoped,
    /// The provider's user name must be a username of the credential store;
    /// unknown identities are rejected.
    LocalPrincipalOnly,
}

/// Maps provider identities to local principals.
///
/// # Spring Security Equivalent
/// `OAuth2UserService` + `GrantedAuthoritiesMapper`
#[derive(Clone)]
pub struct OAuth2UserMapper {
    mapping: OAuth2UserMapping,
    store: Arc<dyn CredentialStore>,
}

impl OAuth2UserMapper {
    pub fn new(mapping: OAuth2UserMapping, store: Arc<dyn CredentialStore>) -> Self {
        Self { mapping, store }
    }

    pub fn mapping(&self) -> OAuth2UserMapping {
        self.mapping
    }

    pub fn map(&self, oauth2_user: &OAuth2User) -> Result<User, OAuth2Error> {
        match self.mapping {
            OAuth2UserMapping::ProviderScoped => {
                let username = format!("{}:{}", oauth2_user.registration_id, oauth2_user.name);
                Ok(User::without_password(&username).roles(&[OAUTH2_USER_ROLE.to_string()]))
            }
            OAuth2UserMapping::LocalPrincipalOnly => self
                .store
                .find_principal(&oauth2_user.name)
                .map_err(|_| {
                    OAuth2Error::UnknownPrincipal(format!(
                        "{}:{}",
                        oauth2_user.registration_id, oauth2_user.name
                    ))
                }),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Authorization request state (stored in session)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequestState {
    /// CSRF state token
    pub state: String,
    /// PKCE code verifier (if PKCE is used)
    pub pkce_verifier: Option<String>,
    /// Provider registration ID
    pub registration_id: String,
    /// Unix timestamp (seconds) when the request was created
    pub created_at: u64,
}

/// OAuth2 client for one registration
///
/// Similar to Spring Security's `OAuth2AuthorizedClientManager`.
#[derive(Clone)]
pub struct OAuth2Client {
    config: OAuth2Config,
    oauth2_client: BasicClient,
    http_client: reqwest::Client,
    timeout: Duration,
}

impl OAuth2Client {
    /// Create a new OAuth2 client from a validated configuration
    pub fn new(config: OAuth2Config) -> Result<Self, OAuth2Error> {
        config.validate()?;

        let auth_url = config
            .authorization_uri
            .clone()
            .ok_or_else(|| OAuth2Error::Configuration("Missing authorization URI".to_string()))?;
        let token_url = config
            .token_uri
            .clone()
            .ok_or_else(|| OAuth2Error::Configuration("Missing token URI".to_string()))?;

        let oauth2_client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(auth_url).map_err(|e| OAuth2Error::Configuration(e.to_string()))?,
            Some(TokenUrl::new(token_url).map_err(|e| OAuth2Error::Configuration(e.to_string()))?),
        )
        .set_redirect_uri(
            RedirectUrl::new(config.redirect_uri.clone())
                .map_err(|e| OAuth2Error::Configuration(e.to_string()))?,
        );

        // GitHub refuses API calls without a user agent
        let http_client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OAuth2Error::Configuration(e.to_string()))?;

        Ok(Self {
            config,
            oauth2_client,
            http_client,
            timeout: Duration::from_secs(10),
        })
    }

    /// Bounds the whole provider round trip (token exchange plus user info).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate an authorization URL for the OAuth2 flow
    ///
    /// Returns (authorization_url, state, pkce_verifier)
    pub fn authorization_url(&self) -> (Url, CsrfToken, Option<PkceCodeVerifier>) {
        let mut auth_request = self.oauth2_client.authorize_url(CsrfToken::new_random);

        for scope in &self.config.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let pkce_verifier = if self.config.use_pkce {
            let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
            auth_request = auth_request.set_pkce_challenge(pkce_challenge);
            Some(pkce_verifier)
        } else {
            None
        };

        let (url, state) = auth_request.url();
        (url, state, pkce_verifier)
    }

    /// Exchanges the authorization code and reads the user info.
    ///
    /// Fails with [`OAuth2Error::Timeout`] when the provider does not answer
    /// within the configured timeout.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<PkceCodeVerifier>,
    ) -> Result<OAuth2User, OAuth2Error> {
        tokio::time::timeout(self.timeout, self.exchange_code_inner(code, pkce_verifier))
            .await
            .map_err(|_| OAuth2Error::Timeout)?
    }

    async fn exchange_code_inner(
        &self,
        code: &str,
        pkce_verifier: Option<PkceCodeVerifier>,
    ) -> Result<OAuth2User, OAuth2Error> {
        let mut token_request = self
            .oauth2_client
            .exchange_code(AuthorizationCode::new(code.to_string()));

        if let Some(verifier) = pkce_verifier {
            token_request = token_request.set_pkce_verifier(verifier);
        }

        let token_response = token_request
            .request_async(async_http_client)
            .await
            .map_err(|e| OAuth2Error::TokenExchange(e.to_string()))?;

        self.fetch_user_info(token_response.access_token().secret())
            .await
    }

    /// Fetch user info from the provider's userinfo endpoint
    async fn fetch_user_info(&self, access_token: &str) -> Result<OAuth2User, OAuth2Error> {
        let userinfo_url = self
            .config
            .userinfo_uri
            .as_ref()
            .ok_or_else(|| OAuth2Error::UserInfo("Missing userinfo URI".to_string()))?;

        let response = self
            .http_client
            .get(userinfo_url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| OAuth2Error::UserInfo(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuth2Error::UserInfo(format!("HTTP {}", response.status())));
        }

        let attributes: HashMap<String, serde_json::Value> = response
            .json()
            .await
            .map_err(|e| OAuth2Error::UserInfo(e.to_string()))?;

        OAuth2User::from_attributes(
            &self.config.registration_id,
            &self.config.user_name_attribute,
            attributes,
        )
    }

    /// Get the configuration
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }
}

/// Repository for multiple OAuth2 client registrations
///
/// Similar to Spring Security's `ClientRegistrationRepository`.
#[derive(Clone, Default)]
pub struct OAuth2ClientRepository {
    clients: HashMap<String, OAuth2Client>,
}

impl OAuth2ClientRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Add a client registration. A second client with the same id is rejected.
    pub fn add_client(&mut self, client: OAuth2Client) -> Result<(), OAuth2Error> {
        let id = client.config.registration_id.clone();
        if self.clients.contains_key(&id) {
            return Err(OAuth2Error::Configuration(format!(
                "duplicate registration id '{}'",
                id
            )));
        }
        self.clients.insert(id, client);
        Ok(())
    }

    /// Get a client by registration ID
    pub fn get_client(&self, registration_id: &str) -> Option<&OAuth2Client> {
        self.clients.get(registration_id)
    }

    /// All registration IDs, sorted
    pub fn registration_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Login page links, sorted by registration id
    pub fn provider_links(&self) -> Vec<ProviderLink> {
        self.registration_ids()
            .into_iter()
            .filter_map(|id| self.clients.get(id))
            .map(|client| ProviderLink {
                registration_id: client.config.registration_id.clone(),
                client_name: client.config.display_name().to_string(),
            })
            .collect()
    }

    /// Build a repository from multiple configurations
    pub fn from_configs(configs: Vec<OAuth2Config>, timeout: Duration) -> Result<Self, OAuth2Error> {
        let mut repo = Self::new();
        for config in configs {
            repo.add_client(OAuth2Client::new(config)?.timeout(timeout))?;
        }
        Ok(repo)
    }
}

// =============================================================================
// Login Service
// =============================================================================

/// Query parameters of the provider's redirect back to the application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationResponse {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Drives the OAuth2 login: redirect to the provider, then the callback.
///
/// # Spring Security Equivalent
/// `OAuth2AuthorizationRequestRedirectFilter` + `OAuth2LoginAuthenticationFilter`
#[derive(Clone)]
pub struct OAuth2LoginService {
    repository: Arc<OAuth2ClientRepository>,
    mapper: OAuth2UserMapper,
    handler: FormLoginHandler,
    authorization_request_ttl: Duration,
}

impl OAuth2LoginService {
    /// `handler` provides session establishment and the success and
    /// failure redirects shared with form login.
    pub fn new(
        repository: Arc<OAuth2ClientRepository>,
        mapper: OAuth2UserMapper,
        handler: FormLoginHandler,
    ) -> Self {
        Self {
            repository,
            mapper,
            handler,
            authorization_request_ttl: Duration::from_secs(10 * 60),
        }
    }

    /// How long a pending authorization request stays valid.
    pub fn authorization_request_ttl(mut self, ttl: Duration) -> Self {
        self.authorization_request_ttl = ttl;
        self
    }

    pub fn repository(&self) -> &OAuth2ClientRepository {
        &self.repository
    }

    /// Starts the flow: remembers the request in the session and
    /// redirects to the provider.
    pub fn begin(&self, session: &Session, registration_id: &str) -> HttpResponse {
        match self.authorization_redirect(session, registration_id) {
            Ok(url) => HttpResponse::Found()
                .insert_header((LOCATION, url.to_string()))
                .finish(),
            Err(e) => {
                tracing::warn!(registration_id = %registration_id, error = %e, "oauth2 login could not start");
                self.handler.on_authentication_failure()
            }
        }
    }

    fn authorization_redirect(&self, session: &Session, registration_id: &str) -> Result<Url, OAuth2Error> {
        let client = self
            .repository
            .get_client(registration_id)
            .ok_or_else(|| OAuth2Error::UnknownRegistration(registration_id.to_string()))?;

        let (url, state, pkce_verifier) = client.authorization_url();
        let request = AuthorizationRequestState {
            state: state.secret().clone(),
            pkce_verifier: pkce_verifier.map(|v| v.secret().clone()),
            registration_id: registration_id.to_string(),
            created_at: unix_now(),
        };

        session
            .insert(AUTHORIZATION_REQUEST_KEY, &request)
            .map_err(|e| OAuth2Error::InvalidState(e.to_string()))?;

        tracing::debug!(registration_id = %registration_id, "redirecting to oauth2 provider");
        Ok(url)
    }

    /// Completes the flow from the provider's callback.
    pub async fn complete(
        &self,
        session: &Session,
        registration_id: &str,
        response: &AuthorizationResponse,
    ) -> HttpResponse {
        match self.authenticate(session, registration_id, response).await {
            Ok(user) => {
                tracing::info!(registration_id = %registration_id, username = %user.get_username(), "oauth2 login succeeded");
                self.handler.on_authentication_success(session, &user)
            }
            Err(e) => {
                tracing::warn!(registration_id = %registration_id, error = %e, "oauth2 login failed");
                self.handler.on_authentication_failure()
            }
        }
    }

    /// Validates the callback and resolves the local principal.
    pub async fn authenticate(
        &self,
        session: &Session,
        registration_id: &str,
        response: &AuthorizationResponse,
    ) -> Result<User, OAuth2Error> {
        // one-time use
        let pending = session
            .get::<AuthorizationRequestState>(AUTHORIZATION_REQUEST_KEY)
            .ok()
            .flatten();
        session.remove(AUTHORIZATION_REQUEST_KEY);

        if let Some(error) = &response.error {
            let detail = match &response.error_description {
                Some(description) => format!("{}: {}", error, description),
                None => error.clone(),
            };
            return Err(OAuth2Error::Provider(detail));
        }

        let pending = pending
            .ok_or_else(|| OAuth2Error::InvalidState("no pending authorization request".to_string()))?;
        self.check_state(&pending, registration_id, response.state.as_deref())?;

        let code = response.code.as_deref().ok_or(OAuth2Error::MissingCode)?;
        let client = self
            .repository
            .get_client(registration_id)
            .ok_or_else(|| OAuth2Error::UnknownRegistration(registration_id.to_string()))?;

        let oauth2_user = client
            .exchange_code(code, pending.pkce_verifier.map(PkceCodeVerifier::new))
            .await?;

        self.mapper.map(&oauth2_user)
    }

    fn check_state(
        &self,
        pending: &AuthorizationRequestState,
        registration_id: &str,
        state: Option<&str>,
    ) -> Result<(), OAuth2Error> {
        if pending.registration_id != registration_id {
            return Err(OAuth2Error::InvalidState(format!(
                "request was started for '{}'",
                pending.registration_id
            )));
        }
        if state != Some(pending.state.as_str()) {
            return Err(OAuth2Error::InvalidState("state mismatch".to_string()));
        }
        if unix_now().saturating_sub(pending.created_at) > self.authorization_request_ttl.as_secs() {
            return Err(OAuth2Error::InvalidState("authorization request expired".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use actix_session::SessionExt;
    use actix_web::test::TestRequest;

    use super::*;
    use crate::http::security::credentials::InMemoryCredentialStore;
    use crate::http::security::form_login::FormLoginConfig;
    use crate::http::security::session::{SessionAuthenticator, SessionConfig};

    fn custom_config() -> OAuth2Config {
        OAuth2Config::new("client-id", "secret", "http://localhost/login/oauth2/code/corp")
            .registration_id("corp")
            .authorization_uri("http://idp.local/authorize")
            .token_uri("http://idp.local/token")
            .userinfo_uri("http://idp.local/userinfo")
            .scopes(vec!["openid", "profile"])
    }

    fn attributes(json: serde_json::Value) -> HashMap<String, serde_json::Value> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_oauth2_config_builder() {
        let config = OAuth2Config::new("client-id", "secret", "http://localhost/callback")
            .provider(OAuth2Provider::Google)
            .add_scope("custom_scope");

        assert_eq!(config.registration_id, "google");
        assert_eq!(config.display_name(), "Google");
        assert_eq!(config.provider, OAuth2Provider::Google);
        assert!(config.scopes.contains(&"openid".to_string()));
        assert!(config.scopes.contains(&"email".to_string()));
        assert!(config.scopes.contains(&"custom_scope".to_string()));
        assert_eq!(config.user_name_attribute, "sub");
        assert!(config.use_pkce);
    }

    #[test]
    fn test_github_defaults() {
        let config = OAuth2Config::new("id", "secret", "http://localhost/login/oauth2/code/github")
            .provider(OAuth2Provider::GitHub);

        assert_eq!(config.registration_id, "github");
        assert_eq!(config.user_name_attribute, "id");
        assert!(!config.use_pkce);
        assert_eq!(config.userinfo_uri.as_deref(), Some("https://api.github.com/user"));
    }

    #[test]
    fn test_validate_reports_missing_values() {
        assert!(custom_config().validate().is_ok());

        let no_secret = OAuth2Config {
            client_secret: String::new(),
            ..custom_config()
        };
        assert!(matches!(no_secret.validate(), Err(OAuth2Error::Configuration(_))));

        let no_client_id = OAuth2Config {
            client_id: " ".to_string(),
            ..custom_config()
        };
        assert!(no_client_id.validate().is_err());

        let no_token_uri = OAuth2Config {
            token_uri: None,
            ..custom_config()
        };
        assert!(no_token_uri.validate().is_err());

        let bad_redirect = OAuth2Config {
            redirect_uri: "not a url".to_string(),
            ..custom_config()
        };
        assert!(bad_redirect.validate().is_err());
    }

    #[test]
    fn test_custom_provider_without_endpoints_is_invalid() {
        let config = OAuth2Config::new("id", "secret", "http://localhost/cb").registration_id("x");
        assert!(OAuth2Client::new(config).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let debug = format!("{:?}", custom_config());
        assert!(debug.contains("client-id"));
        assert!(!debug.contains("\"secret\""));
    }

    #[test]
    fn test_authorization_url() {
        let client = OAuth2Client::new(custom_config()).unwrap();
        let (url, state, verifier) = client.authorization_url();

        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(url.host_str(), Some("idp.local"));
        assert_eq!(query.get("client_id").map(String::as_str), Some("client-id"));
        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(query.get("state"), Some(state.secret()));
        assert_eq!(query.get("scope").map(String::as_str), Some("openid profile"));
        assert!(query.contains_key("code_challenge"));
        assert!(verifier.is_some());
    }

    #[test]
    fn test_authorization_url_without_pkce() {
        let client = OAuth2Client::new(custom_config().use_pkce(false)).unwrap();
        let (url, _, verifier) = client.authorization_url();

        assert!(!url.as_str().contains("code_challenge"));
        assert!(verifier.is_none());
    }

    #[test]
    fn test_oauth2_user_from_attributes() {
        let user = OAuth2User::from_attributes(
            "github",
            "id",
            attributes(serde_json::json!({"id": 42, "login": "octocat"})),
        )
        .unwrap();
        assert_eq!(user.name, "42");
        assert_eq!(user.get_attribute("login"), Some(&serde_json::json!("octocat")));

        let user = OAuth2User::from_attributes("google", "sub", attributes(serde_json::json!({"sub": "abc"})))
            .unwrap();
        assert_eq!(user.name, "abc");

        let missing = OAuth2User::from_attributes("google", "sub", attributes(serde_json::json!({"id": 1})));
        assert!(matches!(missing, Err(OAuth2Error::UserInfo(_))));
    }

    #[test]
    fn test_provider_scoped_mapping() {
        let mapper = OAuth2UserMapper::new(
            OAuth2UserMapping::ProviderScoped,
            Arc::new(InMemoryCredentialStore::new()),
        );
        let user = OAuth2User::from_attributes("github", "id", attributes(serde_json::json!({"id": 42})))
            .unwrap();

        let principal = mapper.map(&user).unwrap();
        assert_eq!(principal.get_username(), "github:42");
        assert!(principal.has_role(OAUTH2_USER_ROLE));
        assert!(!principal.has_password());
    }

    #[test]
    fn test_local_principal_only_mapping() {
        let store = InMemoryCredentialStore::new()
            .with_user(User::with_encoded_password("user", "password".into()).roles(&["USER".into()]));
        let mapper = OAuth2UserMapper::new(OAuth2UserMapping::LocalPrincipalOnly, Arc::new(store));

        let known = OAuth2User::from_attributes("corp", "sub", attributes(serde_json::json!({"sub": "user"})))
            .unwrap();
        let principal = mapper.map(&known).unwrap();
        assert_eq!(principal.get_username(), "user");
        assert!(principal.has_role("USER"));

        let unknown = OAuth2User::from_attributes("corp", "sub", attributes(serde_json::json!({"sub": "eve"})))
            .unwrap();
        assert_eq!(
            mapper.map(&unknown),
            Err(OAuth2Error::UnknownPrincipal("corp:eve".to_string()))
        );
    }

    #[test]
    fn test_mapping_deserialization() {
        let mapping: OAuth2UserMapping = serde_json::from_str("\"local_principal_only\"").unwrap();
        assert_eq!(mapping, OAuth2UserMapping::LocalPrincipalOnly);
        assert_eq!(OAuth2UserMapping::default(), OAuth2UserMapping::ProviderScoped);

        let provider: OAuth2Provider = serde_json::from_str("\"github\"").unwrap();
        assert_eq!(provider, OAuth2Provider::GitHub);
    }

    #[test]
    fn test_repository() {
        let github = OAuth2Config::new("id", "secret", "http://localhost/login/oauth2/code/github")
            .provider(OAuth2Provider::GitHub);
        let repo = OAuth2ClientRepository::from_configs(
            vec![custom_config(), github],
            Duration::from_secs(3),
        )
        .unwrap();

        assert_eq!(repo.registration_ids(), vec!["corp", "github"]);
        assert_eq!(repo.get_client("github").unwrap().get_timeout(), Duration::from_secs(3));
        assert!(repo.get_client("google").is_none());

        let links = repo.provider_links();
        assert_eq!(links[0].client_name, "corp");
        assert_eq!(links[1].client_name, "GitHub");
    }

    fn login_service() -> OAuth2LoginService {
        let repository =
            OAuth2ClientRepository::from_configs(vec![custom_config()], Duration::from_secs(1)).unwrap();
        let store: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
        OAuth2LoginService::new(
            Arc::new(repository),
            OAuth2UserMapper::new(OAuth2UserMapping::ProviderScoped, store),
            FormLoginHandler::new(FormLoginConfig::new(), SessionConfig::new()),
        )
    }

    fn pending_request(session: &Session, age_secs: u64) {
        let request = AuthorizationRequestState {
            state: "state-1".to_string(),
            pkce_verifier: None,
            registration_id: "corp".to_string(),
            created_at: unix_now().saturating_sub(age_secs),
        };
        session.insert(AUTHORIZATION_REQUEST_KEY, request).unwrap();
    }

    fn callback() -> AuthorizationResponse {
        AuthorizationResponse {
            code: Some("abc".to_string()),
            state: Some("state-1".to_string()),
            ..AuthorizationResponse::default()
        }
    }

    #[actix_web::test]
    async fn test_stale_authorization_request_is_rejected() {
        let service = login_service().authorization_request_ttl(Duration::from_secs(600));
        let session = TestRequest::default().to_srv_request().get_session();
        pending_request(&session, 601);

        let result = service.authenticate(&session, "corp", &callback()).await;

        assert_eq!(
            result,
            Err(OAuth2Error::InvalidState("authorization request expired".to_string()))
        );
        assert!(session
            .get::<AuthorizationRequestState>(AUTHORIZATION_REQUEST_KEY)
            .unwrap()
            .is_none());
    }

    #[actix_web::test]
    async fn test_stale_callback_redirects_to_failure_url() {
        let service = login_service();
        let session = TestRequest::default().to_srv_request().get_session();
        pending_request(&session, 11 * 60);

        let resp = service.complete(&session, "corp", &callback()).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(resp.headers().get(LOCATION).unwrap(), "/login?error");
        assert!(!SessionAuthenticator::is_authenticated(&session, &SessionConfig::new()));
    }

    #[actix_web::test]
    async fn test_request_for_other_registration_is_rejected() {
        let service = login_service();
        let session = TestRequest::default().to_srv_request().get_session();
        pending_request(&session, 0);

        let result = service.authenticate(&session, "github", &callback()).await;

        assert!(matches!(result, Err(OAuth2Error::InvalidState(_))));
    }

    #[test]
    fn test_repository_rejects_duplicates() {
        let result = OAuth2ClientRepository::from_configs(
            vec![custom_config(), custom_config()],
            Duration::from_secs(3),
        );
        assert!(matches!(result, Err(OAuth2Error::Configuration(_))));
    }
}
