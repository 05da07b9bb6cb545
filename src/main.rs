use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;

use task_api::{
    auth::{AuthService, PasswordHasher, RevocationStore, TokenIssuer},
    config::Config,
    recovery::CatchPanic,
    routes,
    store::{PgRefreshTokenStore, PgUserStore},
};

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| startup_error("invalid configuration", e))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| startup_error("failed to connect to database", e))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| startup_error("failed to run migrations", e))?;

    let hasher = PasswordHasher::new(config.bcrypt_cost)
        .map_err(|e| startup_error("failed to initialise password hasher", e))?;
    let issuer = TokenIssuer::new(
        config.jwt_secret.as_bytes(),
        config.jwt_algorithm,
        config.access_token_ttl,
    );

    let auth = web::Data::new(AuthService::new(
        Arc::new(PgUserStore::new(pool.clone())),
        Arc::new(PgRefreshTokenStore::new(pool)),
        hasher,
        issuer,
        Arc::new(RevocationStore::new()),
        config.refresh_token_ttl,
    ));

    log::info!(
        "starting server at {} ({:?}, access ttl {}m)",
        config.server_url(),
        config.jwt_algorithm,
        config.access_token_ttl.num_minutes()
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(auth.clone())
            .wrap(CatchPanic)
            .wrap(Logger::default())
            .wrap(cors)
            .service(routes::health::health)
            .service(web::scope("/api/v1").configure(routes::config))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
