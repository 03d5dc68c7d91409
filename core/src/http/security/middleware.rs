//! Security middleware for Actix Web.
//!
//! # Spring Equivalent
//! `SecurityFilterChain` / `FilterChainProxy`
//!
//! Every request runs through three ordered stages:
//! 1. requests to authentication endpoints (login processing, OAuth2
//!    redirect and callback) go straight to their handlers;
//! 2. the [`Authenticator`] restores the session principal into the request
//!    extensions;
//! 3. the [`Authorizer`] allows the request or answers with a challenge.

use std::rc::Rc;

use actix_service::{Service, Transform};
use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::{Error, HttpMessage};
use futures_util::future::{ok, LocalBoxFuture, Ready};

use crate::http::security::config::{Authenticator, Authorizer};
use crate::http::security::route::PathPattern;

/// Security middleware factory.
///
/// # Spring Equivalent
/// `SecurityFilterChain`
///
/// # Example
/// ```ignore
/// App::new().wrap(
///     SecurityTransform::new()
///         .authentication_endpoints(LoginEndpoints::new().endpoint_patterns())
///         .config_authenticator(move || SessionAuthenticator::new(session.clone()))
///         .config_authorizer(move || gate.clone())
/// )
/// ```
pub struct SecurityTransform<Auth, Autho> {
    endpoints: Rc<Vec<PathPattern>>,
    authenticator: Option<Rc<dyn Fn() -> Auth>>,
    authorizer: Option<Rc<dyn Fn() -> Autho>>,
}

impl<Auth, Autho> SecurityTransform<Auth, Autho> {
    pub fn new() -> Self {
        SecurityTransform {
            endpoints: Rc::new(Vec::new()),
            authorizer: None,
            authenticator: None,
        }
    }

    /// Paths served by authentication handlers. They bypass the gate.
    pub fn authentication_endpoints(mut self, endpoints: Vec<PathPattern>) -> Self {
        self.endpoints = Rc::new(endpoints);
        self
    }

    pub fn config_authenticator(mut self, authenticator: impl Fn() -> Auth + 'static) -> Self {
        self.authenticator = Some(Rc::new(authenticator));
        self
    }

    pub fn config_authorizer(mut self, authorizer: impl Fn() -> Autho + 'static) -> Self {
        self.authorizer = Some(Rc::new(authorizer));
        self
    }
}

impl<Auth, Autho> Default for SecurityTransform<Auth, Autho> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B, Auth, Autho> Transform<S, ServiceRequest> for SecurityTransform<Auth, Autho>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    Auth: Authenticator + 'static,
    Autho: Authorizer<B> + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SecurityService<Auth, Autho, S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let authenticator = self.authenticator.as_ref().map(|f| f());
        let authorizer = self.authorizer.as_ref().map(|f| f());

        ok(SecurityService {
            endpoints: Rc::clone(&self.endpoints),
            authenticator,
            authorizer,
            service: Rc::new(service),
        })
    }
}

/// Security middleware service.
///
/// # Spring Equivalent
/// `FilterChainProxy`
pub struct SecurityService<Auth, Autho, S> {
    endpoints: Rc<Vec<PathPattern>>,
    authenticator: Option<Auth>,
    authorizer: Option<Autho>,
    service: Rc<S>,
}

impl<Auth, Autho, S> SecurityService<Auth, Autho, S> {
    fn is_authentication_endpoint(&self, path: &str) -> bool {
        self.endpoints.iter().any(|p| p.matches(path))
    }
}

impl<Auth, Autho, S, B> Service<ServiceRequest> for SecurityService<Auth, Autho, S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    Auth: Authenticator,
    Autho: Authorizer<B>,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        // Stage 1: authentication endpoints
        if self.is_authentication_endpoint(req.path()) {
            let fut = service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        }

        // Stage 2: session authentication
        let user = self
            .authenticator
            .as_ref()
            .and_then(|auth| auth.get_user(&req));

        if let Some(ref u) = user {
            req.extensions_mut().insert(u.clone());
        }

        // Stage 3: authorization
        if let Some(authorizer) = &self.authorizer {
            let next = move |req: ServiceRequest| -> LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>> {
                Box::pin(service.call(req))
            };

            authorizer.process(req, user.as_ref(), next)
        } else {
            let fut = service.call(req);
            Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            })
        }
    }
}
