//! Login endpoint wiring.
//!
//! # Spring Security Equivalent
//! The endpoints `formLogin()` and `oauth2Login()` contribute to the filter chain.
//!
//! | Endpoint | Purpose |
//! |----------|---------|
//! | `GET /login` | generated login page |
//! | `POST /login` | form login processing |
//! | `GET /oauth2/authorization/{registration_id}` | redirect to the provider |
//! | `GET /login/oauth2/code/{registration_id}` | provider callback |
//!
//! # Example
//! ```rust,ignore
//! let endpoints = LoginEndpoints::new(form_login).oauth2(oauth2_login);
//! let patterns = endpoints.endpoint_patterns();
//!
//! App::new()
//!     .configure(|cfg| endpoints.configure(cfg))
//!     .wrap(SecurityTransform::new().authentication_endpoints(patterns) /* ... */)
//! ```

use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};

use crate::http::security::form_login::{FormLoginService, LoginForm};
use crate::http::security::login_page::LoginPage;
#[cfg(feature = "oauth2")]
use crate::http::security::oauth2::{AuthorizationResponse, OAuth2LoginService};
use crate::http::security::route::PathPattern;

pub const AUTHORIZATION_BASE_URL: &str = "/oauth2/authorization";
pub const CALLBACK_BASE_URL: &str = "/login/oauth2/code";

/// Registers the login endpoints on an actix `ServiceConfig`.
#[derive(Clone)]
pub struct LoginEndpoints {
    form_login: FormLoginService,
    login_page: LoginPage,
    #[cfg(feature = "oauth2")]
    oauth2: Option<OAuth2LoginService>,
}

impl LoginEndpoints {
    pub fn new(form_login: FormLoginService) -> Self {
        let login_page = LoginPage::new()
            .processing_url(form_login.handler().config().get_login_processing_url())
            .authorization_base_url(AUTHORIZATION_BASE_URL);

        LoginEndpoints {
            form_login,
            login_page,
            #[cfg(feature = "oauth2")]
            oauth2: None,
        }
    }

    /// Enables OAuth2 login and lists its registrations on the login page.
    #[cfg(feature = "oauth2")]
    pub fn oauth2(mut self, oauth2: OAuth2LoginService) -> Self {
        for link in oauth2.repository().provider_links() {
            self.login_page = self.login_page.provider(&link.registration_id, &link.client_name);
        }
        self.oauth2 = Some(oauth2);
        self
    }

    pub fn login_page(&self) -> &LoginPage {
        &self.login_page
    }

    /// Paths handled here that must reach their handlers without a session.
    pub fn endpoint_patterns(&self) -> Vec<PathPattern> {
        let mut patterns = vec![PathPattern::new(
            self.form_login.handler().config().get_login_processing_url(),
        )];

        #[cfg(feature = "oauth2")]
        if self.oauth2.is_some() {
            patterns.push(PathPattern::new(&format!("{}/*", AUTHORIZATION_BASE_URL)));
            patterns.push(PathPattern::new(&format!("{}/*", CALLBACK_BASE_URL)));
        }

        patterns
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let config = self.form_login.handler().config();

        cfg.app_data(web::Data::new(self.form_login.clone()))
            .app_data(web::Data::new(self.login_page.clone()))
            .route(config.get_login_page(), web::get().to(login_page))
            .route(config.get_login_processing_url(), web::post().to(process_login));

        #[cfg(feature = "oauth2")]
        if let Some(oauth2) = &self.oauth2 {
            cfg.app_data(web::Data::new(oauth2.clone()))
                .route(
                    &format!("{}/{{registration_id}}", AUTHORIZATION_BASE_URL),
                    web::get().to(oauth2_authorization),
                )
                .route(
                    &format!("{}/{{registration_id}}", CALLBACK_BASE_URL),
                    web::get().to(oauth2_callback),
                );
        }
    }
}

fn has_error_flag(req: &HttpRequest) -> bool {
    req.query_string()
        .split('&')
        .any(|param| param == "error" || param.starts_with("error="))
}

async fn login_page(req: HttpRequest, page: web::Data<LoginPage>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page.render(has_error_flag(&req)))
}

async fn process_login(
    session: Session,
    form: Result<web::Form<LoginForm>, actix_web::Error>,
    service: web::Data<FormLoginService>,
) -> HttpResponse {
    match form {
        Ok(form) => service.attempt_authentication_with_form(&session, &form),
        Err(_) => service.reject_malformed(),
    }
}

#[cfg(feature = "oauth2")]
async fn oauth2_authorization(
    session: Session,
    registration_id: web::Path<String>,
    service: web::Data<OAuth2LoginService>,
) -> HttpResponse {
    service.begin(&session, &registration_id)
}

#[cfg(feature = "oauth2")]
async fn oauth2_callback(
    session: Session,
    registration_id: web::Path<String>,
    response: web::Query<AuthorizationResponse>,
    service: web::Data<OAuth2LoginService>,
) -> HttpResponse {
    service.complete(&session, &registration_id, &response).await
}
