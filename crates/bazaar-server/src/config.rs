use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};
use axum_extra::extract::cookie::Key;
use tracing::info;

use bazaar_gateway::ChatScope;

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

/// Longest session lifetime accepted from the environment: one year.
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// The cookie signing key needs at least this much material.
const MIN_SECRET_BYTES: usize = 64;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub upload_dir: PathBuf,
    pub session_ttl_hours: i64,
    pub chat_scope: ChatScope,
    pub cookie_key: Key,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: try_load("BAZAAR_HOST", "0.0.0.0")?,
            port: try_load("BAZAAR_PORT", "3000")?,
            db_path: try_load("BAZAAR_DB_PATH", "bazaar.db")?,
            upload_dir: try_load("BAZAAR_UPLOAD_DIR", "static/uploads")?,
            session_ttl_hours: check_ttl_hours(try_load("BAZAAR_SESSION_TTL_HOURS", "168")?)?, // 7 days
            chat_scope: try_load("BAZAAR_CHAT_SCOPE", "product")?,
            cookie_key: load_key("BAZAAR_SECRET")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}"))
}

fn check_ttl_hours(hours: i64) -> anyhow::Result<i64> {
    if !(1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
        bail!("BAZAAR_SESSION_TTL_HOURS must be between 1 and {MAX_SESSION_TTL_HOURS}, got {hours}");
    }
    Ok(hours)
}

fn load_key(key: &str) -> anyhow::Result<Key> {
    let secret = env::var(key).unwrap_or_default();
    if secret.is_empty() || PLACEHOLDER_SECRETS.contains(&secret.as_str()) {
        bail!("{key} is unset or still a placeholder. Set it in your .env file and restart.");
    }
    if secret.len() < MIN_SECRET_BYTES {
        bail!("{key} must be at least {MIN_SECRET_BYTES} bytes long");
    }
    Key::try_from(secret.as_bytes()).with_context(|| format!("{key} cannot be used as a signing key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let port: u16 = try_load("BAZAAR_TEST_UNSET_PORT", "3000").unwrap();
        assert_eq!(port, 3000);
        let scope: ChatScope = try_load("BAZAAR_TEST_UNSET_SCOPE", "global").unwrap();
        assert_eq!(scope, ChatScope::Global);
        assert!(try_load::<u16>("BAZAAR_TEST_UNSET_PORT", "not-a-port").is_err());
    }

    #[test]
    fn session_lifetime_is_bounded() {
        assert_eq!(check_ttl_hours(168).unwrap(), 168);
        assert_eq!(check_ttl_hours(1).unwrap(), 1);
        assert_eq!(check_ttl_hours(MAX_SESSION_TTL_HOURS).unwrap(), MAX_SESSION_TTL_HOURS);
        assert!(check_ttl_hours(0).is_err());
        assert!(check_ttl_hours(-5).is_err());
        assert!(check_ttl_hours(MAX_SESSION_TTL_HOURS + 1).is_err());
        assert!(check_ttl_hours(i64::MAX).is_err());
    }

    #[test]
    fn unset_secret_is_refused() {
        assert!(load_key("BAZAAR_TEST_UNSET_SECRET").is_err());
    }
}
