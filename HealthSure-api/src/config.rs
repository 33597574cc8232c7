//! Process configuration gathered from the environment

use std::env;

use thiserror::Error;
use tracing::info;

use health_sure_domain::auth::{SecurityError, TokenConfig};
use health_sure_domain::cache::{CacheConfig, CacheError};
use health_sure_domain::database::{DatabaseConfig, DatabaseError};

/// Port used when `PORT` is unset
pub const DEFAULT_PORT: u16 = 5000;

/// Frontend origin used when `APP_URL` or `CORS_ORIGINS` is unset
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";

/// Environment assumed when `APP_ENV` is unset. Development-only behaviour stays off.
pub const DEFAULT_ENVIRONMENT: &str = "production";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}")]
    InvalidEnvVar(&'static str),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Security(#[from] SecurityError),
}

/// Everything needed to start the server
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// `development`, `production`, ...
    pub environment: String,
    /// Frontend base URL, used in password reset links
    pub app_url: String,
    pub cors_origins: Vec<String>,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub tokens: TokenConfig,
}

impl AppConfig {
    /// Read the full configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvVar("PORT"))?,
            Err(_) => DEFAULT_PORT,
        };
        let environment = app_environment(env::var("APP_ENV").ok());
        let app_url = env::var("APP_URL").unwrap_or_else(|_| DEFAULT_APP_URL.to_string());
        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(value) => parse_origins(&value)?,
            Err(_) => Vec::new(),
        };
        let cors_origins = if cors_origins.is_empty() {
            vec![app_url.clone()]
        } else {
            cors_origins
        };

        info!(
            "Application configuration: port={}, environment={}, app_url={}, cors_origins={:?}",
            port, environment, app_url, cors_origins
        );

        Ok(Self {
            port,
            environment,
            app_url,
            cors_origins,
            database: DatabaseConfig::from_env()?,
            cache: CacheConfig::from_env()?,
            tokens: TokenConfig::from_env()?,
        })
    }

    /// Self-contained configuration: in-memory database and cache
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: "development".to_string(),
            app_url: DEFAULT_APP_URL.to_string(),
            cors_origins: vec![DEFAULT_APP_URL.to_string()],
            database: DatabaseConfig::in_memory(),
            cache: CacheConfig::default(),
            tokens: TokenConfig::new(jwt_secret),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

/// `APP_ENV`, or [`DEFAULT_ENVIRONMENT`] when unset or blank
pub fn app_environment(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

/// Split a comma separated origin list, dropping blanks.
///
/// Credentials are allowed cross-origin, so a wildcard origin is rejected.
pub fn parse_origins(value: &str) -> Result<Vec<String>, ConfigError> {
    let origins: Vec<String> = value
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    if origins.iter().any(|origin| origin.contains('*')) {
        return Err(ConfigError::InvalidEnvVar("CORS_ORIGINS"));
    }
    Ok(origins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://localhost:3000/, https://healthsure.app ,,").unwrap(),
            vec!["http://localhost:3000", "https://healthsure.app"]
        );
        assert!(parse_origins(" ").unwrap().is_empty());
    }

    #[test]
    fn test_wildcard_origin_rejected() {
        for value in ["*", "https://healthsure.app, *", "https://*.healthsure.app"] {
            let err = parse_origins(value).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEnvVar("CORS_ORIGINS")));
        }
    }

    #[test]
    fn test_missing_app_env_is_not_development() {
        let config = AppConfig {
            environment: app_environment(None),
            ..AppConfig::in_memory("secret")
        };
        assert_eq!(config.environment, "production");
        assert!(!config.is_development());

        assert_eq!(app_environment(Some("  ".into())), "production");
        assert_eq!(app_environment(Some("development".into())), "development");
    }

    #[test]
    fn test_in_memory_config() {
        let config = AppConfig::in_memory("secret");
        assert!(config.is_development());
        assert_eq!(config.port, 5000);
        assert!(config.database.sqlite_path.is_none());
    }
}
