//! Credential stores: principal lookup and password verification.
//!
//! # Spring Security Equivalent
//! `UserDetailsService` + `org.springframework.security.provisioning.InMemoryUserDetailsManager`

use std::collections::HashMap;
use std::sync::Arc;

use derive_more::{Display, Error};

use crate::http::security::crypto::{NoOpPasswordEncoder, PasswordEncoder, PasswordEncodingError};
use crate::http::security::user::User;

/// Lookup failures of a [`CredentialStore`].
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[display("principal not found")]
    NotFound,
}

/// Source of principals for username/password login.
///
/// # Spring Equivalent
/// `UserDetailsService` combined with the password check of
/// `DaoAuthenticationProvider`.
///
/// The request gate never talks to a store directly, so a persistent,
/// hashed-credential backend can replace [`InMemoryCredentialStore`]
/// without touching the gate.
pub trait CredentialStore: Send + Sync {
    /// Looks up a principal by username.
    fn find_principal(&self, username: &str) -> Result<User, CredentialError>;

    /// Checks a supplied password against the principal's verifier.
    fn verify(&self, principal: &User, supplied_password: &str) -> bool;

    /// Looks up and verifies in one step, returning the principal on success.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable to the caller.
    fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        match self.find_principal(username) {
            Ok(user) if self.verify(&user, password) => Some(user),
            _ => None,
        }
    }
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn find_principal(&self, username: &str) -> Result<User, CredentialError> {
        (**self).find_principal(username)
    }

    fn verify(&self, principal: &User, supplied_password: &str) -> bool {
        (**self).verify(principal, supplied_password)
    }

    fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        (**self).authenticate(username, password)
    }
}

/// Read-only in-memory credential store, populated once at startup.
///
/// # Spring Security Equivalent
/// `InMemoryUserDetailsManager`
///
/// # Example
/// ```
/// use actix_login_gate_core::http::security::{
///     CredentialStore, InMemoryCredentialStore, NoOpPasswordEncoder, User,
/// };
///
/// let store = InMemoryCredentialStore::new()
///     .password_encoder(NoOpPasswordEncoder)
///     .unwrap()
///     .with_user(User::with_encoded_password("user", "password".into()).roles(&["USER".into()]));
///
/// let user = store.find_principal("user").unwrap();
/// assert!(store.verify(&user, "password"));
/// assert!(store.find_principal("nobody").is_err());
/// ```
#[derive(Clone)]
pub struct InMemoryCredentialStore {
    users: HashMap<String, User>,
    password_encoder: Arc<dyn PasswordEncoder>,
    // Checked against when the username is unknown, so that lookups of
    // missing users cost the same as a wrong password.
    unknown_user_hash: String,
}

impl InMemoryCredentialStore {
    /// Creates an empty store using plain-text comparison.
    pub fn new() -> Self {
        InMemoryCredentialStore {
            users: HashMap::new(),
            password_encoder: Arc::new(NoOpPasswordEncoder),
            unknown_user_hash: String::new(),
        }
    }

    /// Sets the password encoder used to verify stored passwords.
    ///
    /// # Spring Security Equivalent
    /// `AuthenticationManagerBuilder.passwordEncoder(PasswordEncoder)`
    ///
    /// Fails when the encoder cannot produce the hash used for unknown users.
    pub fn password_encoder<E: PasswordEncoder + 'static>(
        mut self,
        encoder: E,
    ) -> Result<Self, PasswordEncodingError> {
        self.unknown_user_hash = encoder.encode("unknown-principal")?;
        self.password_encoder = Arc::new(encoder);
        Ok(self)
    }

    /// Adds a principal. A second principal with the same username is ignored.
    pub fn with_user(mut self, user: User) -> Self {
        use std::collections::hash_map::Entry;
        match self.users.entry(user.get_username().to_string()) {
            Entry::Occupied(e) => {
                tracing::warn!(username = %e.key(), "principal already registered, skipping");
            }
            Entry::Vacant(e) => {
                e.insert(user);
            }
        }
        self
    }

    /// Number of registered principals.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for InMemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn find_principal(&self, username: &str) -> Result<User, CredentialError> {
        self.users
            .get(username)
            .cloned()
            .ok_or(CredentialError::NotFound)
    }

    fn verify(&self, principal: &User, supplied_password: &str) -> bool {
        principal.has_password()
            && self
                .password_encoder
                .matches(supplied_password, principal.get_password())
    }

    fn authenticate(&self, username: &str, password: &str) -> Option<User> {
        match self.find_principal(username) {
            Ok(user) => self.verify(&user, password).then_some(user),
            Err(CredentialError::NotFound) => {
                let _ = self
                    .password_encoder
                    .matches(password, &self.unknown_user_hash);
                None
            }
        }
    }
}
