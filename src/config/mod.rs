pub mod session;

use axum::http::HeaderValue;
use std::env;
use std::path::PathBuf;

pub use session::{validate_production_config, SessionConfig, SessionLayer};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
    #[error("FATAL: {0}")]
    Insecure(&'static str),
}

/// Runtime settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub files_dir: PathBuf,
    /// Mailbox that receives student messages.
    pub admin_mailbox: String,
    pub allow_admin_signup: bool,
    pub cors_origin: HeaderValue,
    pub max_upload_bytes: usize,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(AppConfig {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 3001)?,
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            files_dir: env::var("FILES_DIR")
                .unwrap_or_else(|_| "files".to_string())
                .into(),
            admin_mailbox: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@localhost".to_string()),
            allow_admin_signup: env_flag_enabled("ALLOW_ADMIN_SIGNUP"),
            cors_origin: cors_origin()?,
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            session: SessionConfig::from_env()?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn cors_origin() -> Result<HeaderValue, ConfigError> {
    let origin = env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());
    HeaderValue::from_str(origin.trim()).map_err(|_| ConfigError::Invalid("CORS_ORIGIN", origin))
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, value)),
        Err(_) => Ok(default),
    }
}

pub(crate) fn current_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

pub(crate) fn env_flag_enabled(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false)
}

pub fn is_production() -> bool {
    current_environment() == "production"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_apply_when_unset() {
        for key in [
            "HOST",
            "PORT",
            "ADMIN_EMAIL",
            "ALLOW_ADMIN_SIGNUP",
            "MAX_UPLOAD_BYTES",
            "SESSION_TTL_HOURS",
        ] {
            env::remove_var(key);
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:3001");
        assert_eq!(config.admin_mailbox, "admin@localhost");
        assert!(!config.allow_admin_signup);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.session.ttl, time::Duration::hours(24));
    }

    #[test]
    #[serial]
    fn invalid_port_is_reported() {
        env::set_var("PORT", "not-a-port");
        let result = AppConfig::from_env();
        env::remove_var("PORT");
        assert!(matches!(result, Err(ConfigError::Invalid("PORT", _))));
    }
}
