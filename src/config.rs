// src/config.rs
use crate::{NotiqError, Result};
use serde::Deserialize;

/// How to reach the broker. There is no implicit default: callers build one
/// explicitly or load it from the environment, and it is validated before any
/// connection is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let config = Self {
            host: host.into(),
            port,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load `NOTIQ_REDIS_HOST` and `NOTIQ_REDIS_PORT`, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("NOTIQ_REDIS_HOST").map_err(|_| {
            NotiqError::InvalidConfig("NOTIQ_REDIS_HOST environment variable is required".into())
        })?;
        let port = std::env::var("NOTIQ_REDIS_PORT")
            .map_err(|_| {
                NotiqError::InvalidConfig(
                    "NOTIQ_REDIS_PORT environment variable is required".into(),
                )
            })?
            .parse::<u16>()
            .map_err(|_| NotiqError::InvalidConfig("NOTIQ_REDIS_PORT must be a valid port".into()))?;

        Self::new(host, port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(NotiqError::InvalidConfig("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(NotiqError::InvalidConfig("port must be between 1 and 65535".into()));
        }
        Ok(())
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.host.trim(), self.port)
    }
}

/// Top-level configuration, deserializable from any serde source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub redis: ConnectionConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.redis.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_builds_url() {
        let config = ConnectionConfig::new("localhost", 6379).unwrap();
        assert_eq!(config.redis_url(), "redis://localhost:6379");
    }

    #[test]
    fn empty_host_is_rejected() {
        assert!(matches!(
            ConnectionConfig::new("  ", 6379),
            Err(NotiqError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_port_is_rejected() {
        assert!(ConnectionConfig::new("redis", 0).is_err());
    }

    #[test]
    fn deserialized_config_is_checked_on_validate() {
        let config: Config =
            serde_json::from_str(r#"{ "redis": { "host": "", "port": 6379 } }"#).unwrap();
        assert!(config.validate().is_err());

        let bad_port = serde_json::from_str::<Config>(r#"{ "redis": { "host": "h", "port": "x" } }"#);
        assert!(bad_port.is_err());
    }
}
