// Environment-driven configuration

use std::env;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

use crate::llm::{gemini, openai};

pub const DEFAULT_JWT_SECRET: &str = "please-change-me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Credentials and endpoint for one AI provider
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Message DB connection string; `None` selects the in-memory store
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub openai: Option<ProviderConfig>,
    pub gemini: Option<ProviderConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host: IpAddr = match get("HOST") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "HOST",
                reason: format!("'{}' is not an IP address", raw),
            })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let port: u16 = match get("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("'{}' is not a valid port", raw),
            })?,
            None => 5000,
        };

        let jwt_expiration_hours: i64 = match get("JWT_EXPIRATION_HOURS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "JWT_EXPIRATION_HOURS",
                reason: format!("'{}' is not a number", raw),
            })?,
            None => 24,
        };
        if jwt_expiration_hours < 1 {
            return Err(ConfigError::Invalid {
                name: "JWT_EXPIRATION_HOURS",
                reason: "must be at least 1".to_string(),
            });
        }

        let openai = get("OPENAI_API_KEY").map(|api_key| ProviderConfig {
            api_key,
            model: get("OPENAI_MODEL").unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
        });

        let gemini = get("GEMINI_API_KEY").map(|api_key| ProviderConfig {
            api_key,
            model: get("GEMINI_MODEL").unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
            base_url: get("GEMINI_BASE_URL").unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string()),
        });

        Ok(Self {
            host,
            port,
            database_url: get("DATABASE_URL"),
            jwt_secret: get("JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
            jwt_expiration_hours,
            openai,
            gemini,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}
