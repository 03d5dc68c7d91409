//! Demo application: one in-memory user, `/` and `/login` public,
//! everything else behind form login or OAuth2 login.

use actix_web::body::MessageBody;
use actix_web::cookie::Key;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{middleware, App, Error};

pub mod handlers;
pub mod security_config;
pub mod settings;

use security_config::SecurityConfig;

/// Builds the application. The session middleware is registered last so
/// it runs before the security pipeline.
pub fn app(
    security: &SecurityConfig,
    key: Key,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .configure(|cfg| security.endpoints().configure(cfg))
        .configure(handlers::configure)
        .wrap(security.security_transform())
        .wrap(security.session_middleware(key))
        .wrap(middleware::Logger::default())
}
