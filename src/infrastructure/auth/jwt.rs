use jsonwebtoken::{decode, Algorithm, Validation};

use crate::entities::session::{Claims, Session};
use crate::errors::AuthError;
use crate::repositories::token::SessionVerifier;
use crate::settings::{AppConfig, JwtKeys};

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Verifies access tokens issued by the auth provider. This service never mints tokens.
#[derive(Clone)]
pub struct JwtService {
    keys: JwtKeys,
    audience: String,
}

impl JwtService {
    pub fn new(config: &AppConfig) -> Self {
        JwtService {
            keys: JwtKeys::from(config),
            audience: config.jwt_audience.clone(),
        }
    }

    pub fn decode_jwt(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::from)
    }
}

impl SessionVerifier for JwtService {
    fn verify(&self, token: &str) -> Result<Session, AuthError> {
        let claims = self.decode_jwt(token)?;
        Session::try_from(claims)
    }
}
