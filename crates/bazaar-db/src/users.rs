use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension};

use crate::Database;
use crate::models::UserRow;

const USER_COLUMNS: &str = "id, username, password, bio, status, created_at";

impl Database {
    /// Insert a new user. Returns `false` if the username is already taken.
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn user_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                (password_hash, id),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn update_bio(&self, id: &str, bio: Option<&str>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE users SET bio = ?1 WHERE id = ?2", (bio, id))?;
            Ok(changed > 0)
        })
    }

    /// Move a user to `dormant`. Returns `true` only when the status actually changed,
    /// so repeated calls are harmless.
    pub fn mark_dormant(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET status = 'dormant' WHERE id = ?1 AND status != 'dormant'",
                [id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users WHERE {} = ?1",
        USER_COLUMNS, column
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                bio: row.get(3)?,
                status: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}
