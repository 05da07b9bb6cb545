use chrono::Duration;
use jsonwebtoken::Algorithm;
use std::env;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::service::DEFAULT_REFRESH_TTL_MINUTES;
use crate::auth::token::{parse_algorithm, DEFAULT_ACCESS_TTL_MINUTES};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_BCRYPT_COST: u32 = 12;
/// Upper bound for both token lifetimes: ten years.
const MAX_TTL_MINUTES: i64 = 10 * 365 * 24 * 60;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_max_connections", &self.database_max_connections)
            .field("server_port", &self.server_port)
            .field("server_host", &self.server_host)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn ttl_minutes(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: i64,
) -> Result<Duration, ConfigError> {
    let minutes: i64 = parsed(lookup, name, default)?;
    if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
        return Err(ConfigError::Invalid {
            name,
            value: minutes.to_string(),
            reason: format!("must be between 1 and {} minutes", MAX_TTL_MINUTES),
        });
    }
    Ok(Duration::minutes(minutes))
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds a `Config` from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_algorithm = match lookup("JWT_ALGORITHM") {
            None => Algorithm::HS256,
            Some(name) => parse_algorithm(name.trim()).map_err(|e| ConfigError::Invalid {
                name: "JWT_ALGORITHM",
                value: name.clone(),
                reason: e.to_string(),
            })?,
        };

        let bcrypt_cost: u32 = parsed(&lookup, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
                reason: "must be between 4 and 31".into(),
            });
        }

        Ok(Self {
            database_url,
            database_max_connections: parsed(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_MAX_CONNECTIONS,
            )?,
            server_port: parsed(&lookup, "SERVER_PORT", 8080)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret,
            jwt_algorithm,
            access_token_ttl: ttl_minutes(&lookup, "JWT_EXPIRY_MINUTES", DEFAULT_ACCESS_TTL_MINUTES)?,
            refresh_token_ttl: ttl_minutes(
                &lookup,
                "JWT_REFRESH_EXPIRY_MINUTES",
                DEFAULT_REFRESH_TTL_MINUTES,
            )?,
            bcrypt_cost,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}
