use actix_login_gate_core::http::security::login_page::escape_html;
use actix_login_gate_core::http::security::AuthenticatedUser;
use actix_web::{get, HttpResponse, Responder};

/// Only reachable with an authenticated session.
#[get("/dashboard")]
pub async fn index(user: AuthenticatedUser) -> impl Responder {
    let roles = user
        .get_roles()
        .iter()
        .map(|role| escape_html(role))
        .collect::<Vec<_>>()
        .join(", ");

    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Dashboard</title></head>\n<body>\n<h1>Dashboard</h1>\n<p>Signed in as {}.</p>\n<p>Roles: {}</p>\n</body>\n</html>\n",
        escape_html(user.get_username()),
        roles
    ))
}
