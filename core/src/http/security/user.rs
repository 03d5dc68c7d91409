//! Principal model for authentication and authorization.
//!
//! # Spring Equivalent
//! `UserDetails` interface

use std::fmt;

/// An identity known to the gate: a username, an encoded password
/// verifier and a set of roles.
///
/// # Spring Equivalent
/// `UserDetails` / `User`
///
/// # Example
/// ```
/// use actix_login_gate_core::http::security::User;
///
/// let user = User::with_encoded_password("user", "{noop}password".into())
///     .roles(&["USER".into()]);
///
/// assert!(user.has_role("USER"));
/// assert!(!user.has_role("ADMIN"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    username: String,
    password: String,
    roles: Vec<String>,
}

impl User {
    /// Creates a principal with a pre-encoded password.
    ///
    /// # Spring Security Equivalent
    /// `User.withUsername().password("{argon2}...").build()`
    pub fn with_encoded_password(username: &str, encoded_password: String) -> Self {
        User {
            username: username.to_string(),
            password: encoded_password,
            roles: Vec::new(),
        }
    }

    /// Creates a principal that carries no password verifier.
    ///
    /// Used for identities established elsewhere (a session or an
    /// OAuth2 provider), which can never pass a password check.
    pub fn without_password(username: &str) -> Self {
        Self::with_encoded_password(username, String::new())
    }

    pub fn get_username(&self) -> &str {
        &self.username
    }

    /// Returns the encoded password verifier.
    pub fn get_password(&self) -> &str {
        &self.password
    }

    pub fn get_roles(&self) -> &[String] {
        &self.roles
    }

    /// Adds roles to the principal, skipping ones it already has.
    pub fn roles(mut self, roles: &[String]) -> Self {
        for role in roles {
            if !self.roles.contains(role) {
                self.roles.push(role.clone());
            }
        }
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Checks if the principal has ANY of the specified roles.
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Returns true if a password verifier is attached.
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User {{ username: {}, roles: {:?} }}",
            self.username, self.roles
        )
    }
}
