//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use whiteroom_content::OpenAiConfig;
use whiteroom_content::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};

use crate::error::AppError;

/// Settings read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen address.
    pub addr: SocketAddr,
    /// PostgreSQL URL; the in-process store is used when absent.
    pub database_url: Option<String>,
    /// Expiry window for stored sessions, history and audits.
    pub session_ttl: Duration,
    /// Allowed browser origin; any origin when absent.
    pub cors_origin: Option<String>,
    /// Content-generation API settings.
    pub openai: OpenAiConfig,
    /// OTLP/gRPC collector endpoint; spans are not exported when absent.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port: u16 = var("PORT")
            .unwrap_or_else(|| "3001".to_owned())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        let ttl_secs: u64 = var("SESSION_TTL_SECS")
            .unwrap_or_else(|| "3600".to_owned())
            .parse()
            .map_err(|e| AppError::Config(format!("SESSION_TTL_SECS must be whole seconds: {e}")))?;
        if ttl_secs == 0 {
            return Err(AppError::Config("SESSION_TTL_SECS must be positive".to_owned()));
        }

        let api_key = var("OPENAI_API_KEY").ok_or_else(|| {
            AppError::Config("OPENAI_API_KEY environment variable must be set".to_owned())
        })?;

        Ok(Self {
            addr,
            database_url: var("DATABASE_URL"),
            session_ttl: Duration::from_secs(ttl_secs),
            cors_origin: var("CORS_ORIGIN"),
            openai: OpenAiConfig {
                api_key,
                model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
                base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            },
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}
