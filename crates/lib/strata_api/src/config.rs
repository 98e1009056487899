//! API server configuration.

use strata_core::auth::AuthError;
use strata_core::auth::config::AuthConfig;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3200").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Validated token/API-key secrets and environment flag.
    pub auth: AuthConfig,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable       | Default                          |
    /// |----------------|----------------------------------|
    /// | `BIND_ADDR`    | `127.0.0.1:3200`                 |
    /// | `DATABASE_URL` | `postgres://localhost:5432/strata` |
    ///
    /// Secret handling is documented on [`AuthConfig::from_env`]; a
    /// misconfigured production environment fails here, at startup.
    pub fn from_env() -> Result<Self, AuthError> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3200".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/strata".into()),
            auth: AuthConfig::from_env()?,
        })
    }
}
