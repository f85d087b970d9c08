use std::env;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha512};
use time::Duration;
use tower_sessions::{
    cookie::{Key, SameSite},
    service::SignedCookie,
    Expiry, SessionManagerLayer,
};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::warn;

use super::{current_environment, env_flag_enabled, ConfigError};

/// Convenience alias for the signed session layer produced by `SessionConfig`.
pub type SessionLayer = SessionManagerLayer<SqliteStore, SignedCookie>;

pub const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    /// Absolute lifetime of a login session; it is not extended on activity.
    pub ttl: Duration,
    pub name: String,
}

impl SessionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(value) => value
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or_else(|| ConfigError::Invalid("SESSION_TTL_HOURS", value))?,
            Err(_) => DEFAULT_TTL_HOURS,
        };
        let ttl = Duration::hours(ttl_hours);

        if current_environment() == "production" {
            Ok(SessionConfig {
                secure: true,
                http_only: true,
                same_site: SameSite::Strict,
                ttl,
                name: "__Host-session".to_string(),
            })
        } else {
            Ok(SessionConfig {
                secure: false,
                http_only: true,
                same_site: SameSite::Lax,
                ttl,
                name: "session".to_string(),
            })
        }
    }

    pub fn create_layer(&self, store: SqliteStore) -> SessionLayer {
        let key = load_session_key();

        // Login replaces this with an absolute expiry. Unmodified sessions are
        // never re-saved, so later requests cannot push that expiry out.
        SessionManagerLayer::new(store)
            .with_secure(self.secure)
            .with_http_only(self.http_only)
            .with_same_site(self.same_site)
            .with_name(self.name.clone())
            .with_expiry(Expiry::OnInactivity(self.ttl))
            .with_always_save(false)
            .with_signed(key)
    }
}

pub fn validate_production_config() -> Result<(), ConfigError> {
    if current_environment() != "production" {
        return Ok(());
    }

    if !env_flag_enabled("FORCE_HTTPS") {
        return Err(ConfigError::Insecure(
            "Production environment requires HTTPS. Set FORCE_HTTPS=true",
        ));
    }

    let secret = env::var("SESSION_SECRET").map_err(|_| ConfigError::Missing("SESSION_SECRET"))?;
    let decoded_secret = decode_secret_bytes(&secret);

    if decoded_secret.len() < 64 {
        return Err(ConfigError::Insecure(
            "SESSION_SECRET must be at least 64 bytes in production",
        ));
    }

    let lowered = secret.to_ascii_lowercase();
    if lowered.contains("example") || lowered.contains("changeme") || lowered.contains("default") {
        return Err(ConfigError::Insecure(
            "SESSION_SECRET appears to be a default value. Generate a secure secret!",
        ));
    }

    Ok(())
}

fn load_session_key() -> Key {
    match env::var("SESSION_SECRET") {
        Ok(secret) if !secret.is_empty() => {
            let bytes = decode_secret_bytes(&secret);
            key_from_secret_bytes(&bytes)
        }
        _ => {
            warn!("SESSION_SECRET not set; generating ephemeral key (development only)");
            Key::generate()
        }
    }
}

fn decode_secret_bytes(secret: &str) -> Vec<u8> {
    STANDARD
        .decode(secret.as_bytes())
        .unwrap_or_else(|_| secret.as_bytes().to_vec())
}

fn key_from_secret_bytes(bytes: &[u8]) -> Key {
    if bytes.len() >= 64 {
        Key::from(&bytes[..64])
    } else {
        let digest = Sha512::digest(bytes);
        Key::from(digest.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_secrets_are_stretched_to_a_full_key() {
        let key = key_from_secret_bytes(b"short");
        assert_eq!(key.master().len(), 64);
        assert_eq!(key.master(), key_from_secret_bytes(b"short").master());
    }

    #[test]
    fn base64_secrets_are_decoded() {
        assert_eq!(decode_secret_bytes("aGVsbG8="), b"hello".to_vec());
        assert_eq!(decode_secret_bytes("not base64!"), b"not base64!".to_vec());
    }
}
