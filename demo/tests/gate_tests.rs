//! Integration tests for the request gate and form login.

mod common;

use actix_login_gate_core::http::security::{AccessPolicy, CredentialStore};
use actix_login_gate_demo::app;
use actix_login_gate_demo::security_config::user_details_service;
use actix_login_gate_demo::settings::Settings;
use actix_web::cookie::Key;
use actix_web::http::StatusCode;
use actix_web::test;

use common::{location, security, session_cookie};

// =============================================================================
// Public routes
// =============================================================================

#[actix_web::test]
async fn test_home_is_public() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("You are not signed in."));
}

#[actix_web::test]
async fn test_login_page_is_public() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::get().uri("/login").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8_lossy(&test::read_body(resp).await).to_string();
    assert!(body.contains("name=\"username\""));
    assert!(body.contains("name=\"password\""));
    assert!(!body.contains("Bad credentials"));
    assert!(!body.contains("/oauth2/authorization/"));
}

#[actix_web::test]
async fn test_login_page_shows_error_flag() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::get().uri("/login?error").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("Bad credentials"));
}

// =============================================================================
// Protected routes
// =============================================================================

#[actix_web::test]
async fn test_dashboard_redirects_to_login() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::get().uri("/dashboard").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn test_unknown_route_redirects_to_login() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::get().uri("/nowhere").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn test_oauth2_routes_absent_without_registrations() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::get()
        .uri("/oauth2/authorization/github")
        .to_request();
    let resp = test::call_service(&app, req).await;

    // not a login endpoint, so the gate challenges it like any other route
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}

// =============================================================================
// Form login
// =============================================================================

#[actix_web::test]
async fn test_login_returns_to_saved_request() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::get().uri("/dashboard").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/login");
    let cookie = session_cookie(&resp).expect("saved request cookie");

    let req = test::TestRequest::post()
        .uri("/login")
        .cookie(cookie)
        .set_form([("username", "user"), ("password", "password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/dashboard");
    let cookie = session_cookie(&resp).expect("authenticated session cookie");

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8_lossy(&test::read_body(resp).await).to_string();
    assert!(body.contains("Signed in as user."));
    assert!(body.contains("USER"));
}

#[actix_web::test]
async fn test_login_never_returns_to_another_host() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    for target in ["//evil.example/phish", "//evil.example/phish?next=1"] {
        let req = test::TestRequest::get().uri(target).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/login");

        let mut req = test::TestRequest::post()
            .uri("/login")
            .set_form([("username", "user"), ("password", "password")]);
        if let Some(cookie) = session_cookie(&resp) {
            req = req.cookie(cookie);
        }
        let resp = test::call_service(&app, req.to_request()).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/", "{target}");
    }
}

#[actix_web::test]
async fn test_login_without_saved_request_goes_home() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "user"), ("password", "password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    let cookie = session_cookie(&resp).expect("authenticated session cookie");

    let req = test::TestRequest::get().uri("/").cookie(cookie).to_request();
    let resp = test::call_service(&app, req).await;
    let body = test::read_body(resp).await;
    assert!(String::from_utf8_lossy(&body).contains("Signed in as user."));
}

#[actix_web::test]
async fn test_wrong_password_is_rejected() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::get().uri("/dashboard").to_request();
    let resp = test::call_service(&app, req).await;
    let cookie = session_cookie(&resp).expect("saved request cookie");

    let req = test::TestRequest::post()
        .uri("/login")
        .cookie(cookie.clone())
        .set_form([("username", "user"), ("password", "wrong")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login?error");

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(session_cookie(&resp).unwrap_or(cookie))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn test_unknown_user_is_rejected_like_wrong_password() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "nonexistent"), ("password", "password")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login?error");
}

#[actix_web::test]
async fn test_malformed_login_form_is_rejected() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "user")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login?error");
}

#[actix_web::test]
async fn test_tampered_cookie_is_anonymous() {
    let app = test::init_service(app(&security(&Settings::default()), Key::generate())).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "user"), ("password", "password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    let mut cookie = session_cookie(&resp).expect("authenticated session cookie");
    cookie.set_value(format!("{}x", cookie.value()));

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/login");
}

#[actix_web::test]
async fn test_session_from_other_key_is_anonymous() {
    let settings = Settings::default();
    let config = security(&settings);
    let first = test::init_service(app(&config, Key::generate())).await;
    let second = test::init_service(app(&config, Key::generate())).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "user"), ("password", "password")])
        .to_request();
    let resp = test::call_service(&first, req).await;
    let cookie = session_cookie(&resp).expect("authenticated session cookie");

    let req = test::TestRequest::get()
        .uri("/dashboard")
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&second, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
}

// =============================================================================
// Gate and credential store
// =============================================================================

#[::std::prelude::v1::test]
fn test_gate_decisions_are_stable() {
    let config = security(&Settings::default());
    let gate = config.gate();

    for _ in 0..3 {
        assert_eq!(gate.decide("/"), AccessPolicy::Public);
        assert_eq!(gate.decide("/login"), AccessPolicy::Public);
        assert_eq!(gate.decide("/dashboard"), AccessPolicy::Authenticated);
        assert_eq!(gate.decide("/anything/else"), AccessPolicy::Authenticated);
    }
}

#[::std::prelude::v1::test]
fn test_demo_credential_store() {
    let store = user_details_service().unwrap();

    let user = store.find_principal("user").unwrap();
    assert_eq!(user.get_username(), "user");
    assert!(user.has_role("USER"));
    assert!(store.verify(&user, "password"));
    assert!(!store.verify(&user, "wrong"));
    assert!(store.find_principal("nonexistent").is_err());
}
