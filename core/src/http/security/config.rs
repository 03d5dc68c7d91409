//! Pipeline stage traits.
//!
//! # Spring Equivalent
//! `SecurityContextRepository` and `AuthorizationManager` interfaces

use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::Error;
use futures_util::future::LocalBoxFuture;

use crate::http::security::user::User;

/// Restores the principal of an incoming request, if it has one.
///
/// # Spring Equivalent
/// `SecurityContextRepository.loadContext`
///
/// Returns an owned `User` so it can be stored in request extensions
/// for access by handlers.
pub trait Authenticator {
    fn get_user(&self, req: &ServiceRequest) -> Option<User>;
}

/// Decides whether a request may reach its handler.
///
/// # Spring Equivalent
/// `AuthorizationFilter` + `AuthenticationEntryPoint`
///
/// The `process` method returns a boxed future that resolves to:
/// - `EitherBody::left()` when forwarding to the inner service
/// - `EitherBody::right()` for a response produced by the stage itself (a challenge)
pub trait Authorizer<B> {
    /// # Arguments
    /// * `req` - The incoming request
    /// * `user` - The principal restored by the [`Authenticator`] (if any)
    /// * `next` - Closure calling the next service in the chain
    fn process(
        &self,
        req: ServiceRequest,
        user: Option<&User>,
        next: impl FnOnce(ServiceRequest) -> LocalBoxFuture<'static, Result<ServiceResponse<B>, Error>>
            + 'static,
    ) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>>;
}
