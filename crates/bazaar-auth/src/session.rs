//! Registration, login and the session lifecycle.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use bazaar_db::Database;
use bazaar_types::error::{MarketError, MarketResult};
use bazaar_types::models::AccountStatus;

use crate::config::AuthConfig;
use crate::password::{hash_password, verify_password};

/// The identity a valid session token resolves to.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
}

/// A freshly issued login. `token` is handed to the client and is not stored server-side.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
}

pub fn register(db: &Database, username: &str, password: &str) -> MarketResult<Uuid> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(MarketError::InvalidInput(
            "username and password are required".into(),
        ));
    }

    let password_hash = hash_password(password)?;
    let user_id = Uuid::new_v4();

    if !db.create_user(&user_id.to_string(), username, &password_hash)? {
        return Err(MarketError::DuplicateUsername);
    }

    info!("Registered user {} ({})", username, user_id);
    Ok(user_id)
}

pub fn authenticate(
    db: &Database,
    config: &AuthConfig,
    username: &str,
    password: &str,
) -> MarketResult<Session> {
    let now = Utc::now();
    let purged = db.purge_expired_sessions(now)?;
    if purged > 0 {
        debug!("Purged {} expired sessions", purged);
    }

    let row = db
        .get_user_by_username(username.trim())?
        .ok_or(MarketError::InvalidCredentials)?;

    if !verify_password(password, &row.password)? {
        return Err(MarketError::InvalidCredentials);
    }

    let user = row.into_user()?;
    if user.status == AccountStatus::Dormant {
        return Err(MarketError::AccountDormant);
    }

    let token = new_token();
    let expires_at = now
        .checked_add_signed(config.session_ttl)
        .ok_or_else(|| anyhow!("session lifetime {} is out of range", config.session_ttl))?;
    db.create_session(&token, &user.id.to_string(), expires_at)?;

    info!("{} ({}) logged in", user.username, user.id);
    Ok(Session {
        token,
        user_id: user.id,
    })
}

/// Resolve a session token to its user. Unknown, expired and dormant-owned
/// sessions all fail with `NotAuthenticated`.
pub fn resolve(db: &Database, token: &str) -> MarketResult<SessionUser> {
    let user = db
        .session_user(token, Utc::now())?
        .ok_or(MarketError::NotAuthenticated)?
        .into_user()?;

    if user.status == AccountStatus::Dormant {
        db.delete_session(token)?;
        debug!("Dropped session of dormant user {}", user.id);
        return Err(MarketError::NotAuthenticated);
    }

    Ok(SessionUser {
        id: user.id,
        username: user.username,
    })
}

pub fn change_password(
    db: &Database,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> MarketResult<()> {
    if new_password.is_empty() {
        return Err(MarketError::InvalidInput("new password is required".into()));
    }

    let id = user_id.to_string();
    let row = db
        .get_user_by_id(&id)?
        .ok_or(MarketError::InvalidCredentials)?;

    if !verify_password(current_password, &row.password)? {
        return Err(MarketError::InvalidCredentials);
    }

    db.update_password(&id, &hash_password(new_password)?)?;
    info!("{} ({}) changed password", row.username, id);
    Ok(())
}

pub fn logout(db: &Database, token: &str) -> MarketResult<()> {
    if db.delete_session(token)? {
        debug!("Session closed");
    }
    Ok(())
}

/// 256 random bits, URL-safe so the token can live in a cookie unescaped.
fn new_token() -> String {
    let bytes: [u8; 32] = rand::random();
    B64.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn duplicate_registration_fails() {
        let db = db();
        register(&db, "alice", "hunter22").unwrap();
        assert!(matches!(
            register(&db, "alice", "other-password"),
            Err(MarketError::DuplicateUsername)
        ));
    }

    #[test]
    fn stored_credential_is_not_plaintext() {
        let db = db();
        register(&db, "alice", "hunter22").unwrap();
        let row = db.get_user_by_username("alice").unwrap().unwrap();
        assert_ne!(row.password, "hunter22");
        assert!(!row.password.contains("hunter22"));
    }

    #[test]
    fn login_resolves_to_registered_user() {
        let db = db();
        let user_id = register(&db, "alice", "hunter22").unwrap();

        let session = authenticate(&db, &AuthConfig::default(), "alice", "hunter22").unwrap();
        assert_eq!(session.user_id, user_id);

        let resolved = resolve(&db, &session.token).unwrap();
        assert_eq!(resolved.id, user_id);
        assert_eq!(resolved.username, "alice");
    }

    #[test]
    fn wrong_password_and_unknown_user_look_the_same() {
        let db = db();
        register(&db, "alice", "hunter22").unwrap();
        let config = AuthConfig::default();

        assert!(matches!(
            authenticate(&db, &config, "alice", "hunter23"),
            Err(MarketError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&db, &config, "mallory", "hunter22"),
            Err(MarketError::InvalidCredentials)
        ));
    }

    #[test]
    fn each_login_issues_a_distinct_token() {
        let db = db();
        register(&db, "alice", "hunter22").unwrap();
        let config = AuthConfig::default();
        let a = authenticate(&db, &config, "alice", "hunter22").unwrap();
        let b = authenticate(&db, &config, "alice", "hunter22").unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn logout_invalidates_the_session() {
        let db = db();
        register(&db, "alice", "hunter22").unwrap();
        let session = authenticate(&db, &AuthConfig::default(), "alice", "hunter22").unwrap();

        logout(&db, &session.token).unwrap();
        assert!(matches!(
            resolve(&db, &session.token),
            Err(MarketError::NotAuthenticated)
        ));
        // second logout is a no-op
        logout(&db, &session.token).unwrap();
    }

    #[test]
    fn expired_session_does_not_resolve() {
        let db = db();
        register(&db, "alice", "hunter22").unwrap();
        let config = AuthConfig {
            session_ttl: Duration::seconds(-1),
        };
        let session = authenticate(&db, &config, "alice", "hunter22").unwrap();
        assert!(matches!(
            resolve(&db, &session.token),
            Err(MarketError::NotAuthenticated)
        ));
    }

    #[test]
    fn out_of_range_lifetime_fails_without_panicking() {
        let db = db();
        register(&db, "alice", "hunter22").unwrap();
        let config = AuthConfig {
            session_ttl: Duration::hours(1_000_000_000_000),
        };
        assert!(matches!(
            authenticate(&db, &config, "alice", "hunter22"),
            Err(MarketError::Storage(_))
        ));
    }

    #[test]
    fn dormant_users_lose_access() {
        let db = db();
        let user_id = register(&db, "alice", "hunter22").unwrap();
        let config = AuthConfig::default();
        let session = authenticate(&db, &config, "alice", "hunter22").unwrap();

        db.mark_dormant(&user_id.to_string()).unwrap();

        assert!(matches!(
            resolve(&db, &session.token),
            Err(MarketError::NotAuthenticated)
        ));
        assert!(matches!(
            authenticate(&db, &config, "alice", "hunter22"),
            Err(MarketError::AccountDormant)
        ));
    }

    #[test]
    fn change_password_requires_current_password() {
        let db = db();
        let user_id = register(&db, "alice", "hunter22").unwrap();
        let config = AuthConfig::default();

        assert!(matches!(
            change_password(&db, user_id, "wrong", "newpass99"),
            Err(MarketError::InvalidCredentials)
        ));
        change_password(&db, user_id, "hunter22", "newpass99").unwrap();

        assert!(authenticate(&db, &config, "alice", "hunter22").is_err());
        assert!(authenticate(&db, &config, "alice", "newpass99").is_ok());
    }

    #[test]
    fn blank_registration_is_rejected() {
        let db = db();
        assert!(matches!(
            register(&db, "   ", "hunter22"),
            Err(MarketError::InvalidInput(_))
        ));
    }
}
