//! Database row types. These map directly to SQLite rows.
//! Distinct from bazaar-types models to keep the DB layer independent.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use bazaar_types::models::{ChatMessage, Price, Product, User};

pub struct UserRow {
    pub id: String,
    pub username: String,
    /// Argon2id PHC string
    pub password: String,
    pub bio: Option<String>,
    pub status: String,
    pub created_at: String,
}

pub struct ProductRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub image_key: Option<String>,
    pub created_at: String,
}

pub struct ChatMessageRow {
    pub id: String,
    pub product_id: String,
    pub username: String,
    pub message: String,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_uuid("users.id", &self.id)?,
            status: self.status.parse().map_err(|e: String| anyhow!(e))?,
            created_at: parse_timestamp(&self.created_at)?,
            username: self.username,
            bio: self.bio,
        })
    }
}

impl ProductRow {
    pub fn into_product(self) -> Result<Product> {
        Ok(Product {
            id: parse_uuid("products.id", &self.id)?,
            owner_id: parse_uuid("products.owner_id", &self.owner_id)?,
            price: Price::from_cents(self.price_cents)
                .ok_or_else(|| anyhow!("negative price on product '{}'", self.id))?,
            created_at: parse_timestamp(&self.created_at)?,
            title: self.title,
            description: self.description,
            image_key: self.image_key,
        })
    }
}

impl ChatMessageRow {
    pub fn into_message(self) -> Result<ChatMessage> {
        Ok(ChatMessage {
            id: parse_uuid("chat_messages.id", &self.id)?,
            product_id: parse_uuid("chat_messages.product_id", &self.product_id)?,
            created_at: parse_timestamp(&self.created_at)?,
            username: self.username,
            message: self.message,
        })
    }
}

fn parse_uuid(column: &str, value: &str) -> Result<Uuid> {
    value
        .parse()
        .with_context(|| format!("corrupt {} '{}'", column, value))
}

/// Accepts RFC 3339 and SQLite's bare `datetime('now')` form, read as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", value))
}
