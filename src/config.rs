use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Secret used when `JWT_SECRET` is not set. Only suitable for local development.
pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Process configuration, read once at startup and handed to every component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub request_timeout: Duration,
    /// Empty means any origin is allowed.
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set, falling back to the development secret");
                DEFAULT_JWT_SECRET.to_string()
            }
        };

        let port = parse_number(&lookup, "PORT", 8080)?;
        let port = u16::try_from(port).map_err(|_| ConfigError::InvalidNumber {
            name: "PORT",
            value: port.to_string(),
        })?;

        let timeout_secs = parse_number(&lookup, "REQUEST_TIMEOUT_SECS", 10)?;

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(AppConfig {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            db_path: lookup("DB_PATH").unwrap_or_else(|| "./data/blog.db".to_string()),
            jwt_secret,
            request_timeout: Duration::from_secs(timeout_secs),
            cors_origins,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn parse_number<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.db_path, "./data/blog.db");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.uses_default_secret());
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn test_values_are_read_from_source() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "5000"),
            ("JWT_SECRET", "s3cret"),
            ("REQUEST_TIMEOUT_SECS", "3"),
            ("CORS_ORIGINS", "http://localhost:3000, https://blog.example.com"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.jwt_secret, "s3cret");
        assert!(!config.uses_default_secret());
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:3000", "https://blog.example.com"]
        );
    }

    #[test]
    fn test_empty_secret_falls_back_to_default() {
        let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "")])).unwrap();
        assert!(config.uses_default_secret());
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(AppConfig::from_lookup(lookup_from(&[("PORT", "http")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("PORT", "70000")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "0")])).is_err());
    }
}
