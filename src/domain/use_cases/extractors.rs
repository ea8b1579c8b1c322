use actix_web::{FromRequest, HttpRequest, HttpMessage};
use futures_util::future::{ready, Ready};
use crate::{entities::session::Session, errors::AuthError};

/// Session placed in the request extensions by the auth middleware.
/// Rejects with 401 when the route was reached without one.
#[derive(Debug)]
pub struct AuthSession(pub Session);

impl FromRequest for AuthSession {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<Session>() {
            Some(session) => ready(Ok(AuthSession(session.clone()))),
            None => ready(Err(AuthError::MissingCredentials.into())),
        }
    }
}
