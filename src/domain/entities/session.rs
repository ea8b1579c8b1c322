use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AuthError;

/// Claims carried by the auth provider's access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
}

/// Authenticated caller, passed explicitly into every owner-scoped operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Session {
            user_id,
            email: email.into(),
            issued_at: Utc::now(),
        }
    }
}

impl TryFrom<Claims> for Session {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;
        let issued_at = claims
            .iat
            .and_then(|iat| Utc.timestamp_opt(iat as i64, 0).single())
            .unwrap_or_else(Utc::now);

        Ok(Session {
            user_id,
            email: claims.email.unwrap_or_default(),
            issued_at,
        })
    }
}
