use crate::{entities::session::Session, errors::AuthError};

pub trait SessionVerifier: Send + Sync {
    /// Verifies a bearer token and returns the session it carries.
    fn verify(&self, token: &str) -> Result<Session, AuthError>;
}
