//! Security module providing authentication and authorization.
//!
//! # Spring Equivalent
//! `org.springframework.security` package
//!
//! # Module Structure
//!
//! - `config` - Pipeline stage traits (Authenticator, Authorizer)
//! - `credentials` - Credential stores (InMemoryCredentialStore)
//! - `crypto` - Password encoding (Argon2, NoOp, Delegating)
//! - `route` - Route rules (PathPattern, RouteRules)
//! - `gate` - The request gate (RequestGate)
//! - `session` - Session-based authentication
//! - `form_login` - Form login processing
//! - `login_page` - Generated login page
//! - `oauth2` - OAuth2 login
//! - `web` - Login endpoint wiring (LoginEndpoints)
//! - `extractor` - Actix Web extractors (AuthenticatedUser, OptionalUser)
//! - `manager` - Factory methods (AuthenticationManager, AuthorizationManager)
//! - `middleware` - Security middleware (SecurityTransform)
//! - `user` - User model
//!
//! # Feature Flags
//! - `argon2`: Enables `Argon2PasswordEncoder` and `DelegatingPasswordEncoder`
//! - `oauth2`: Enables OAuth2 login

// Re-exports for convenience
pub use config::{Authenticator, Authorizer};
pub use credentials::{CredentialError, CredentialStore, InMemoryCredentialStore};
pub use crypto::{NoOpPasswordEncoder, PasswordEncoder, PasswordEncodingError};
#[cfg(feature = "argon2")]
pub use crypto::{Argon2PasswordEncoder, DelegatingPasswordEncoder};
pub use extractor::{AuthenticatedUser, OptionalUser, SecurityExt};
pub use form_login::{FormLoginConfig, FormLoginHandler, FormLoginService, LoginForm};
pub use gate::{GateDecision, RequestGate};
pub use login_page::LoginPage;
pub use manager::{AuthenticationManager, AuthorizationManager};
pub use middleware::SecurityTransform;
#[cfg(feature = "oauth2")]
pub use self::oauth2::{
    OAuth2Client, OAuth2ClientRepository, OAuth2Config, OAuth2Error, OAuth2LoginService,
    OAuth2Provider, OAuth2User, OAuth2UserMapper, OAuth2UserMapping,
};
pub use route::{AccessPolicy, PathPattern, RouteRule, RouteRules};
pub use session::{
    SessionAuthenticator, SessionConfig, SessionError, SessionFixationStrategy, SessionUser,
};
pub use user::User;
pub use web::LoginEndpoints;

// Internal modules (private implementation details)
mod config;
mod extractor;
mod user;

// Public modules
pub mod credentials;
pub mod crypto;
pub mod form_login;
pub mod gate;
pub mod login_page;
pub mod manager;
pub mod middleware;
#[cfg(feature = "oauth2")]
pub mod oauth2;
pub mod route;
pub mod session;
pub mod web;
