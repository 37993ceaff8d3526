use std::fmt;

use anyhow::Context;
use jsonwebtoken::Algorithm;

const DEFAULT_TTL_MINUTES: i64 = 30;

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[REDACTED]")
            .field("jwt", &self.jwt)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        anyhow::ensure!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let algorithm = parse_algorithm(
            &std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".into()),
        )?;

        let ttl_minutes = match std::env::var("JWT_TTL_MINUTES") {
            Ok(v) => v
                .parse::<i64>()
                .with_context(|| format!("JWT_TTL_MINUTES is not an integer: {v}"))?,
            Err(_) => DEFAULT_TTL_MINUTES,
        };
        anyhow::ensure!(ttl_minutes > 0, "JWT_TTL_MINUTES must be positive");

        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v
                .parse::<u16>()
                .with_context(|| format!("APP_PORT is not a port number: {v}"))?,
            Err(_) => 8080,
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt: JwtConfig {
                secret,
                algorithm,
                ttl_minutes,
            },
        })
    }
}

/// Only HMAC algorithms can be driven by a shared secret.
pub fn parse_algorithm(name: &str) -> anyhow::Result<Algorithm> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => anyhow::bail!("unsupported JWT_ALGORITHM {other}; expected HS256, HS384 or HS512"),
    }
}
