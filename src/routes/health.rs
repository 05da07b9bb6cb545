use actix_web::{get, web, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    fn ok(now: DateTime<Utc>) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: now,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Liveness check. Public, and touches neither store.
#[get("/health")]
pub async fn health() -> impl Responder {
    web::Json(HealthResponse::ok(Utc::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::header, test as actix_test, App};

    #[actix_rt::test]
    async fn test_health_reports_status_and_build() {
        let before = Utc::now();
        let app = actix_test::init_service(App::new().service(health)).await;

        let req = actix_test::TestRequest::get().uri("/health").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body: HealthResponse = actix_test::read_body_json(resp).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
        assert!(body.timestamp >= before && body.timestamp <= Utc::now());
    }

    #[actix_rt::test]
    async fn test_health_only_answers_get() {
        let app = actix_test::init_service(App::new().service(health)).await;

        let req = actix_test::TestRequest::post().uri("/health").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_client_error());
    }
}
