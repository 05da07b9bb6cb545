use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::AppError;

/// The caller of a protected route, as established by `AuthMiddleware`.
///
/// Carries the raw bearer token so logout can revoke exactly what was presented.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub claims: Claims,
    pub token: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().cloned() {
            Some(user) => ready(Ok(user)),
            None => {
                // Only reachable when a route forgot to wrap AuthMiddleware.
                let err = AppError::Unauthorized("Unauthorized".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
