use actix_login_gate_core::http::security::login_page::escape_html;
use actix_login_gate_core::http::security::OptionalUser;
use actix_web::{get, HttpResponse, Responder};

/// Public landing page.
#[get("/")]
pub async fn index(user: OptionalUser) -> impl Responder {
    let greeting = match user.into_inner() {
        Some(user) => format!(
            "<p>Signed in as {}.</p>\n<p><a href=\"/dashboard\">Dashboard</a></p>",
            escape_html(user.get_username())
        ),
        None => "<p>You are not signed in.</p>\n<p><a href=\"/login\">Sign in</a></p>".to_string(),
    };

    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Home</title></head>\n<body>\n<h1>Welcome</h1>\n{}\n</body>\n</html>\n",
        greeting
    ))
}
