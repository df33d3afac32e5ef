use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::token::Claims;
use crate::error::AppError;

/// The verified identity attached to a request by `AuthMiddleware`.
///
/// Only the gate can build one, so a handler taking an `AuthenticatedUser` only
/// ever runs for a request that passed token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    id: i64,
    username: String,
}

impl AuthenticatedUser {
    pub(crate) fn from_claims(claims: &Claims) -> Result<Self, AppError> {
        if claims.user_id <= 0 {
            return Err(AppError::InvalidToken("token subject is not a valid user id".into()));
        }
        Ok(Self {
            id: claims.user_id,
            username: claims.username.clone(),
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().cloned() {
            Some(user) => ready(Ok(user)),
            // Route is not behind the gate.
            None => ready(Err(AppError::MissingCredential.into())),
        }
    }
}
