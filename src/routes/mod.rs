pub mod auth;
pub mod health;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::error::AppError;

/// Malformed or mistyped JSON bodies answer 400 with the usual `{"error"}` shape.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("rejected request body: {}", err);
    AppError::BadRequest(err.to_string()).into()
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(
            web::scope("/auth")
                .service(auth::login)
                .service(auth::register)
                .service(auth::refresh)
                .service(auth::logout)
                .service(auth::me),
        );
}
