//! # Actix Login Gate
//!
//! Session-based access control for Actix Web: an in-memory credential
//! store, an ordered route rule list, form login and OAuth2 login, wired
//! together by an explicit middleware pipeline.
//!
//! The main functionality lives under [`http::security`]; error types
//! are in [`http::error`].

pub mod http;
