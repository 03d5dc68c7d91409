use crate::http::security::credentials::InMemoryCredentialStore;
use crate::http::security::gate::RequestGate;

pub struct AuthenticationManager {}

impl AuthenticationManager {
    /// # Spring Equivalent
    /// `new InMemoryUserDetailsManager(...)`
    pub fn in_memory_authentication() -> InMemoryCredentialStore {
        InMemoryCredentialStore::new()
    }
}

pub struct AuthorizationManager {}

impl AuthorizationManager {
    /// # Spring Equivalent
    /// `http.authorizeHttpRequests(...)`
    pub fn request_gate() -> RequestGate {
        RequestGate::new()
    }
}
