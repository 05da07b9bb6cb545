use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use chrono::Utc;
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::{AuthError, AuthService, AuthenticatedUser};
use crate::error::AppError;

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    match header_value.split_once(' ') {
        Some(("Bearer", token)) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::Unauthorized(
            "Malformed authorization header".into(),
        )),
    }
}

/// Guards a route: requires a bearer token that is neither revoked nor invalid,
/// and stores the resulting [`AuthenticatedUser`] in the request extensions.
///
/// The [`AuthService`] is looked up from app data, so the middleware can be
/// attached with `#[post("/path", wrap = "AuthMiddleware")]`.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

fn authenticate(req: &ServiceRequest) -> Result<AuthenticatedUser, AppError> {
    let auth = req.app_data::<web::Data<AuthService>>().ok_or_else(|| {
        AppError::InternalServerError("Authentication is not configured".into())
    })?;

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed authorization header".into()))?;

    let token = bearer_token(header_value)?;
    let claims = auth.authenticate(token, Utc::now())?;

    Ok(AuthenticatedUser {
        user_id: claims.user_id,
        claims,
        token: token.to_string(),
    })
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match authenticate(&req) {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(app_err) => {
                log::warn!("rejected request to {}: {}", req.path(), app_err);
                Box::pin(async move { Ok(req.error_response(app_err).map_into_right_body()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{PasswordHasher, RevocationStore, TokenIssuer};
    use crate::store::{InMemoryRefreshTokenStore, InMemoryUserStore};
    use actix_web::{http::StatusCode, test as actix_test, App, HttpResponse};
    use chrono::Duration;
    use jsonwebtoken::Algorithm;
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
        assert!(bearer_token("Bearer").is_err());
        assert!(bearer_token("Bearer   ").is_err());
        assert!(bearer_token("bearer abc").is_err());
        assert!(bearer_token("Basic dXNlcjpwYXNz").is_err());
        assert!(bearer_token("abc.def.ghi").is_err());
    }

    fn auth_data() -> web::Data<AuthService> {
        web::Data::new(AuthService::new(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryRefreshTokenStore::new()),
            PasswordHasher::new(4).unwrap(),
            TokenIssuer::new(b"middleware-secret", Algorithm::HS256, Duration::minutes(5)),
            Arc::new(RevocationStore::new()),
            Duration::days(1),
        ))
    }

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id.to_string())
    }

    #[actix_rt::test]
    async fn test_middleware_gates_protected_route() {
        let auth = auth_data();
        let user_id = Uuid::new_v4();
        let token = auth.issuer().issue(user_id, Utc::now()).unwrap();

        let app = actix_test::init_service(
            App::new().app_data(auth.clone()).service(
                web::resource("/protected")
                    .wrap(AuthMiddleware)
                    .route(web::get().to(whoami)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/protected")
            .append_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(resp).await, user_id.to_string());

        for header in [None, Some("Token abc".to_string()), Some("Bearer garbage".to_string())] {
            let mut req = actix_test::TestRequest::get().uri("/protected");
            if let Some(value) = header {
                req = req.append_header(("Authorization", value));
            }
            let resp = actix_test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        }

        auth.revocations()
            .revoke(&token, Utc::now() + Duration::minutes(5));
        let req = actix_test::TestRequest::get()
            .uri("/protected")
            .append_header(("Authorization", format!("Bearer {}", token)))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
