use crate::{
    auth::{AuthError, AuthMiddleware, AuthService, AuthenticatedUser, LoginRequest},
    error::AppError,
    models::{LogoutRequest, RefreshRequest, RegisterRequest, UserResponse},
};
use actix_web::{post, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

/// Register a new user
///
/// Creates a new account and returns its public profile.
#[post("/registration")]
pub async fn register(
    auth: web::Data<AuthService>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let RegisterRequest {
        name,
        email,
        password,
    } = register_data.into_inner();
    let user = auth.register(name, email, password).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Login user
///
/// Verifies the credentials and returns an access/refresh token pair.
#[post("/login")]
pub async fn login(
    auth: web::Data<AuthService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    // Malformed credentials get the same answer as wrong ones.
    if let Err(e) = login_data.validate() {
        log::warn!("failed login: {}", e);
        return Err(AuthError::InvalidCredentials.into());
    }

    let user = auth.login(&login_data.email, &login_data.password).await?;
    let tokens = auth.issue_session(user.id, Utc::now()).await?;

    log::info!("user {} logged in", user.id);
    Ok(HttpResponse::Ok().json(tokens))
}

/// Exchange a refresh token for a new token pair. The old refresh token is consumed.
#[post("/refresh")]
pub async fn refresh(
    auth: web::Data<AuthService>,
    refresh_data: web::Json<RefreshRequest>,
) -> Result<impl Responder, AppError> {
    let tokens = auth.refresh(&refresh_data.refresh_token, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// An empty body means no refresh token; anything else must be valid JSON.
fn parse_logout_body(body: &[u8]) -> Result<LogoutRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LogoutRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Revoke the presented access token, and the refresh token if one is supplied.
#[post("/logout", wrap = "AuthMiddleware")]
pub async fn logout(
    auth: web::Data<AuthService>,
    user: AuthenticatedUser,
    body: web::Bytes,
) -> Result<impl Responder, AppError> {
    let body = parse_logout_body(&body)?;
    auth.logout(&user.token, body.refresh_token.as_deref(), Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Logged out successfully" })))
}

#[post("/me", wrap = "AuthMiddleware")]
pub async fn me(
    auth: web::Data<AuthService>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = auth.current_user(user.user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}
