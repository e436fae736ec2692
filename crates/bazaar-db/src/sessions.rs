use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use sha2::{Digest, Sha256};

use crate::models::UserRow;
use crate::{Database, format_timestamp};

/// Sessions are stored under the SHA-256 of the client token, never the token itself.
pub fn session_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl Database {
    pub fn create_session(
        &self,
        token: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let id = session_digest(token);
        let expires_at = format_timestamp(expires_at);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
                (&id, user_id, &expires_at),
            )?;
            Ok(())
        })
    }

    /// Look up the user behind an unexpired session token.
    pub fn session_user(&self, token: &str, now: DateTime<Utc>) -> Result<Option<UserRow>> {
        let id = session_digest(token);
        let now = format_timestamp(now);
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT u.id, u.username, u.password, u.bio, u.status, u.created_at
                     FROM sessions s
                     JOIN users u ON s.user_id = u.id
                     WHERE s.id = ?1 AND s.expires_at > ?2",
                    (&id, &now),
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            password: row.get(2)?,
                            bio: row.get(3)?,
                            status: row.get(4)?,
                            created_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let id = session_digest(token);
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", [&id])?;
            Ok(removed > 0)
        })
    }

    pub fn delete_sessions_for_user(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM sessions WHERE user_id = ?1", [user_id])?))
    }

    pub fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let now = format_timestamp(now);
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [&now])?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn db_with_user() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "hash").unwrap();
        db
    }

    #[test]
    fn token_resolves_until_expiry() {
        let db = db_with_user();
        let now = Utc::now();
        db.create_session("tok", "u1", now + Duration::hours(1)).unwrap();

        let user = db.session_user("tok", now).unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(db.session_user("tok", now + Duration::hours(2)).unwrap().is_none());
        assert!(db.session_user("other", now).unwrap().is_none());
    }

    #[test]
    fn raw_token_is_not_stored() {
        let db = db_with_user();
        db.create_session("tok", "u1", Utc::now() + Duration::hours(1)).unwrap();
        let stored: String = db
            .with_conn(|conn| Ok(conn.query_row("SELECT id FROM sessions", [], |r| r.get(0))?))
            .unwrap();
        assert_ne!(stored, "tok");
        assert_eq!(stored, session_digest("tok"));
    }

    #[test]
    fn delete_and_purge() {
        let db = db_with_user();
        let now = Utc::now();
        db.create_session("live", "u1", now + Duration::hours(1)).unwrap();
        db.create_session("stale", "u1", now - Duration::hours(1)).unwrap();

        assert_eq!(db.purge_expired_sessions(now).unwrap(), 1);
        assert!(db.delete_session("live").unwrap());
        assert!(!db.delete_session("live").unwrap());
        assert_eq!(db.delete_sessions_for_user("u1").unwrap(), 0);
    }
}
