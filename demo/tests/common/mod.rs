//! Shared test infrastructure: settings, cookie handling and a local
//! stand-in for an OAuth2 provider.
#![allow(dead_code)]

use std::net::TcpListener;

use actix_login_gate_demo::security_config::SecurityConfig;
use actix_login_gate_demo::settings::Settings;
use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::json;

/// Name of the session cookie set by `actix-session`.
pub const SESSION_COOKIE: &str = "id";

pub fn security(settings: &Settings) -> SecurityConfig {
    SecurityConfig::new(settings).expect("valid security configuration")
}

/// The session cookie the response sets, if any.
pub fn session_cookie<B: MessageBody>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.into_owned())
}

pub fn location<B>(resp: &ServiceResponse<B>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
}

/// Settings with a single custom registration `mock` pointing at `base_url`.
pub fn mock_settings(base_url: &str, use_pkce: bool, timeout_secs: u64) -> Settings {
    let settings = Settings::from_toml(&format!(
        r#"
        [oauth2]
        timeout_secs = {timeout_secs}

        [oauth2.registrations.mock]
        client_name = "Mock Provider"
        client_id = "mock-client"
        client_secret = "mock-secret"
        redirect_uri = "http://localhost:8080/login/oauth2/code/mock"
        authorization_uri = "{base_url}/authorize"
        token_uri = "{base_url}/token"
        userinfo_uri = "{base_url}/user"
        user_name_attribute = "id"
        use_pkce = {use_pkce}
        "#
    ))
    .unwrap();
    settings.validate().unwrap();
    settings
}

async fn token() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "access_token": "mock-access-token",
        "token_type": "bearer",
        "expires_in": 3600
    }))
}

async fn user(req: HttpRequest) -> HttpResponse {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some("Bearer mock-access-token");

    if authorized {
        HttpResponse::Ok().json(json!({ "id": 42, "login": "octocat" }))
    } else {
        HttpResponse::Unauthorized().finish()
    }
}

/// Starts a provider answering the token and user info calls. Must be
/// called from inside the actix runtime.
pub fn start_mock_provider() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(|| {
        App::new()
            .route("/token", web::post().to(token))
            .route("/user", web::get().to(user))
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();
    actix_web::rt::spawn(server);

    format!("http://{}", addr)
}

/// A listener that accepts connections but never answers.
pub fn silent_provider() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    (listener, url)
}
