use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// Key for symbol map signatures. Changing it makes every stored map
    /// fall back to the default on load.
    pub signing_secret: String,
    pub token_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("CIPHERCHAN_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CIPHERCHAN_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }
        let signing_secret =
            std::env::var("CIPHERCHAN_SIGNING_SECRET").unwrap_or_else(|_| jwt_secret.clone());

        let host = std::env::var("CIPHERCHAN_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("CIPHERCHAN_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("CIPHERCHAN_PORT must be a port number")?;
        let db_path: PathBuf = std::env::var("CIPHERCHAN_DB_PATH")
            .unwrap_or_else(|_| "cipherchan.db".into())
            .into();
        let token_ttl_days: i64 = std::env::var("CIPHERCHAN_TOKEN_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            signing_secret,
            token_ttl_days,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
