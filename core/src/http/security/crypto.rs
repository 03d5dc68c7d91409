//! Password verifiers.
//!
//! # Spring Security Equivalent
//! `org.springframework.security.crypto.password.PasswordEncoder`
//!
//! # Feature Flags
//! - `argon2`: Enables `Argon2PasswordEncoder` and `DelegatingPasswordEncoder` (default)

#[cfg(feature = "argon2")]
use argon2::password_hash::rand_core::OsRng;
#[cfg(feature = "argon2")]
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
#[cfg(feature = "argon2")]
use argon2::Argon2;
use derive_more::{Display, Error};

/// A password could not be encoded.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
#[display("password encoding failed: {reason}")]
pub struct PasswordEncodingError {
    reason: String,
}

impl PasswordEncodingError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Trait for encoding and verifying passwords.
///
/// # Spring Security Equivalent
/// `PasswordEncoder` interface
pub trait PasswordEncoder: Send + Sync {
    /// Encode the raw password.
    fn encode(&self, raw_password: &str) -> Result<String, PasswordEncodingError>;

    /// Verify a raw password against an encoded password.
    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool;

    /// Returns true if the encoded password should be re-encoded.
    fn upgrade_encoding(&self, _encoded_password: &str) -> bool {
        false
    }
}

/// Argon2 password encoder.
///
/// # Spring Security Equivalent
/// `Argon2PasswordEncoder`
///
/// # Example
/// ```
/// use actix_login_gate_core::http::security::crypto::{PasswordEncoder, Argon2PasswordEncoder};
///
/// let encoder = Argon2PasswordEncoder::new();
/// let hash = encoder.encode("password").unwrap();
///
/// assert!(encoder.matches("password", &hash));
/// assert!(!encoder.matches("wrong", &hash));
/// ```
#[cfg(feature = "argon2")]
#[derive(Clone)]
pub struct Argon2PasswordEncoder {
    argon2: Argon2<'static>,
}

#[cfg(feature = "argon2")]
impl Argon2PasswordEncoder {
    pub fn new() -> Self {
        Argon2PasswordEncoder {
            argon2: Argon2::default(),
        }
    }
}

#[cfg(feature = "argon2")]
impl Default for Argon2PasswordEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "argon2")]
impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, PasswordEncodingError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(raw_password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordEncodingError::new(e.to_string()))
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        match PasswordHash::new(encoded_password) {
            Ok(parsed_hash) => self
                .argon2
                .verify_password(raw_password.as_bytes(), &parsed_hash)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Plain-text password "encoder".
///
/// # Spring Security Equivalent
/// `NoOpPasswordEncoder`
///
/// Only suitable for tests and throwaway demo credentials.
#[derive(Clone, Copy, Default)]
pub struct NoOpPasswordEncoder;

impl PasswordEncoder for NoOpPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, PasswordEncodingError> {
        Ok(raw_password.to_string())
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        raw_password == encoded_password
    }
}

/// Password encoder that picks the algorithm from an `{id}` prefix on
/// the stored hash.
///
/// # Spring Security Equivalent
/// `DelegatingPasswordEncoder` (what `User.withDefaultPasswordEncoder()`
/// builds on)
///
/// Supported formats:
/// - `{argon2}hash`
/// - `{noop}plain`
///
/// Hashes without a known prefix never match.
///
/// # Example
/// ```
/// use actix_login_gate_core::http::security::crypto::{PasswordEncoder, DelegatingPasswordEncoder};
///
/// let encoder = DelegatingPasswordEncoder::new();
/// let hash = encoder.encode("password").unwrap();
///
/// assert!(hash.starts_with("{argon2}"));
/// assert!(encoder.matches("password", &hash));
/// assert!(encoder.matches("plain", "{noop}plain"));
/// ```
#[cfg(feature = "argon2")]
#[derive(Clone, Default)]
pub struct DelegatingPasswordEncoder {
    argon2: Argon2PasswordEncoder,
}

#[cfg(feature = "argon2")]
impl DelegatingPasswordEncoder {
    pub fn new() -> Self {
        DelegatingPasswordEncoder {
            argon2: Argon2PasswordEncoder::new(),
        }
    }
}

#[cfg(feature = "argon2")]
impl PasswordEncoder for DelegatingPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, PasswordEncodingError> {
        Ok(format!("{{argon2}}{}", self.argon2.encode(raw_password)?))
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        if let Some(hash) = encoded_password.strip_prefix("{argon2}") {
            self.argon2.matches(raw_password, hash)
        } else if let Some(plain) = encoded_password.strip_prefix("{noop}") {
            raw_password == plain
        } else {
            false
        }
    }

    fn upgrade_encoding(&self, encoded_password: &str) -> bool {
        !encoded_password.starts_with("{argon2}")
    }
}

#[cfg(all(test, feature = "argon2"))]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_encoder() {
        let encoder = Argon2PasswordEncoder::new();
        let hash = encoder.encode("password").unwrap();

        assert_ne!(hash, "password");
        assert!(encoder.matches("password", &hash));
        assert!(!encoder.matches("wrong", &hash));
    }

    #[test]
    fn test_argon2_rejects_garbage_hash() {
        let encoder = Argon2PasswordEncoder::new();
        assert!(!encoder.matches("password", "not-a-phc-string"));
    }

    #[test]
    fn test_noop_encoder() {
        let encoder = NoOpPasswordEncoder;
        let encoded = encoder.encode("plain_password").unwrap();

        assert_eq!(encoded, "plain_password");
        assert!(encoder.matches("plain_password", &encoded));
    }

    #[test]
    fn test_delegating_encoder() {
        let encoder = DelegatingPasswordEncoder::new();

        let hash = encoder.encode("password").unwrap();
        assert!(hash.starts_with("{argon2}"));
        assert!(encoder.matches("password", &hash));
        assert!(!encoder.matches("wrong", &hash));

        assert!(encoder.matches("plain", "{noop}plain"));
        assert!(!encoder.matches("plain", "plain"));

        assert!(encoder.upgrade_encoding("{noop}plain"));
        assert!(!encoder.upgrade_encoding(&hash));
    }
}
