use anyhow::Result;

use crate::Database;
use crate::models::ChatMessageRow;

impl Database {
    /// Append a chat message. Returns the server-assigned timestamp.
    pub fn insert_chat_message(
        &self,
        id: &str,
        product_id: &str,
        username: &str,
        message: &str,
    ) -> Result<String> {
        self.with_conn(|conn| {
            let created_at = conn.query_row(
                "INSERT INTO chat_messages (id, product_id, username, message)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING created_at",
                rusqlite::params![id, product_id, username, message],
                |row| row.get(0),
            )?;
            Ok(created_at)
        })
    }

    /// Full conversation for a product, oldest first. Insertion order breaks timestamp ties.
    pub fn chat_history(&self, product_id: &str) -> Result<Vec<ChatMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, product_id, username, message, created_at
                 FROM chat_messages
                 WHERE product_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([product_id], |row| {
                    Ok(ChatMessageRow {
                        id: row.get(0)?,
                        product_id: row.get(1)?,
                        username: row.get(2)?,
                        message: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductRow;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("alice", "alice", "hash").unwrap();
        for id in ["p1", "p2"] {
            db.insert_product(&ProductRow {
                id: id.into(),
                owner_id: "alice".into(),
                title: "Lamp".into(),
                description: "Brass".into(),
                price_cents: 500,
                image_key: None,
                created_at: String::new(),
            })
            .unwrap();
        }
        db
    }

    #[test]
    fn history_is_per_product_and_in_insertion_order() {
        let db = setup();
        db.insert_chat_message("m1", "p1", "alice", "first").unwrap();
        db.insert_chat_message("m2", "p2", "bob", "elsewhere").unwrap();
        db.insert_chat_message("m3", "p1", "bob", "second").unwrap();

        let history: Vec<String> = db
            .chat_history("p1")
            .unwrap()
            .into_iter()
            .map(|m| m.message)
            .collect();
        assert_eq!(history, vec!["first", "second"]);
    }

    #[test]
    fn deleting_a_product_drops_its_conversation() {
        let db = setup();
        db.insert_chat_message("m1", "p1", "alice", "hello").unwrap();
        assert!(db.delete_product("p1", "alice").unwrap());
        assert!(db.chat_history("p1").unwrap().is_empty());
    }

    #[test]
    fn message_for_missing_product_is_rejected() {
        let db = setup();
        assert!(db.insert_chat_message("m1", "nope", "alice", "hello").is_err());
    }
}
