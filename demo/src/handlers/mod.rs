use actix_web::web;

pub mod dashboard;
pub mod home;

/// Registers the application pages.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(home::index).service(dashboard::index);
}
