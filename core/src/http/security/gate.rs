//! The request gate: route classification and challenge.
//!
//! # Spring Security Equivalent
//! `AuthorizationFilter` with a `RequestMatcherDelegatingAuthorizationManager`,
//! plus `LoginUrlAuthenticationEntryPoint` and `HttpSessionRequestCache`.

use actix_session::SessionExt;
use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::{http, Error, HttpResponse};
use futures_util::future::LocalBoxFuture;

use crate::http::security::config::Authorizer;
use crate::http::security::route::{AccessPolicy, RouteRules};
use crate::http::security::session::{SessionAuthenticator, SessionConfig};
use crate::http::security::user::User;

/// Outcome of [`RequestGate::enforce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The request reaches its handler.
    Allow,
    /// The client is sent to the authentication entry point.
    Challenge,
}

/// Route-rule based request gate.
///
/// # Example
/// ```
/// use actix_login_gate_core::http::security::gate::{GateDecision, RequestGate};
/// use actix_login_gate_core::http::security::route::{AccessPolicy, RouteRules};
/// use actix_login_gate_core::http::security::User;
///
/// let gate = RequestGate::new().rules(
///     RouteRules::new()
///         .permit_all(&["/", "/login"])
///         .any_request(AccessPolicy::Authenticated),
/// );
/// let user = User::without_password("user");
///
/// assert_eq!(gate.enforce("/", None), GateDecision::Allow);
/// assert_eq!(gate.enforce("/dashboard", None), GateDecision::Challenge);
/// assert_eq!(gate.enforce("/dashboard", Some(&user)), GateDecision::Allow);
/// ```
#[derive(Debug, Clone)]
pub struct RequestGate {
    rules: RouteRules,
    login_url: String,
    session_config: Option<SessionConfig>,
}

impl RequestGate {
    /// Creates a gate whose rules require authentication everywhere.
    pub fn new() -> Self {
        RequestGate {
            rules: RouteRules::new(),
            login_url: "/login".to_string(),
            session_config: None,
        }
    }

    pub fn rules(mut self, rules: RouteRules) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the authentication entry point (default: "/login").
    ///
    /// # Spring Security Equivalent
    /// `formLogin().loginPage("/login")`
    pub fn login_url(mut self, url: &str) -> Self {
        self.login_url = url.to_string();
        self
    }

    /// Enables the saved request: a challenged GET request's URL is stored
    /// in the session so a successful login can send the client back to it.
    pub fn save_requests(mut self, config: SessionConfig) -> Self {
        self.session_config = Some(config);
        self
    }

    pub fn get_rules(&self) -> &RouteRules {
        &self.rules
    }

    pub fn get_login_url(&self) -> &str {
        &self.login_url
    }

    /// Classifies a request path.
    pub fn decide(&self, path: &str) -> AccessPolicy {
        self.rules.decide(path)
    }

    /// Decides whether a request for `path` carrying `session` may proceed.
    pub fn enforce(&self, path: &str, session: Option<&User>) -> GateDecision {
        match (self.decide(path), session) {
            (AccessPolicy::Public, _) => GateDecision::Allow,
            (AccessPolicy::Authenticated, Some(_)) => GateDecision::Allow,
            (AccessPolicy::Authenticated, None) => GateDecision::Challenge,
        }
    }

    fn save_request(&self, req: &ServiceRequest) {
        let Some(config) = &self.session_config else {
            return;
        };
        if req.method() != http::Method::GET {
            return;
        }

        let url = match req.query_string() {
            "" => req.path().to_string(),
            query => format!("{}?{}", req.path(), query),
        };
        if let Err(e) = SessionAuthenticator::save_request(&req.get_session(), &url, config) {
            tracing::warn!(error = %e, "could not save request");
        }
    }
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: 'static> Authorizer<B> for RequestGate {
    fn process(
        &self,
        req: ServiceRequest,
        user: Option<&User>,
        next: impl FnOnce(ServiceRequest) -> LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>
            + 'static,
    ) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>> {
        match self.enforce(req.path(), user) {
            GateDecision::Allow => Box::pin(async move {
                let res = next(req).await?;
                Ok(res.map_into_left_body())
            }),
            GateDecision::Challenge => {
                tracing::debug!(path = %req.path(), "challenging unauthenticated request");
                self.save_request(&req);

                let login_url = self.login_url.clone();
                Box::pin(async move {
                    Ok(req.into_response(
                        HttpResponse::Found()
                            .append_header((http::header::LOCATION, login_url))
                            .finish()
                            .map_into_right_body(),
                    ))
                })
            }
        }
    }
}
