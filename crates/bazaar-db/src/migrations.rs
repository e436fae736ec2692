use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            bio         TEXT,
            status      TEXT NOT NULL DEFAULT 'active'
                        CHECK (status IN ('active', 'dormant')),
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        -- id is the SHA-256 of the token held by the client
        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            expires_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user
            ON sessions(user_id);

        CREATE TABLE IF NOT EXISTS products (
            id           TEXT PRIMARY KEY,
            owner_id     TEXT NOT NULL REFERENCES users(id),
            title        TEXT NOT NULL,
            description  TEXT NOT NULL,
            price_cents  INTEGER NOT NULL CHECK (price_cents >= 0),
            image_key    TEXT,
            created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_products_owner
            ON products(owner_id);

        -- target_id may name a user, a product, or nothing at all
        CREATE TABLE IF NOT EXISTS reports (
            id           TEXT PRIMARY KEY,
            reporter_id  TEXT NOT NULL REFERENCES users(id),
            target_kind  TEXT NOT NULL CHECK (target_kind IN ('user', 'product', 'unknown')),
            target_id    TEXT NOT NULL,
            reason       TEXT NOT NULL,
            created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_reports_target
            ON reports(target_id);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id          TEXT PRIMARY KEY,
            product_id  TEXT NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            username    TEXT NOT NULL,
            message     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_product
            ON chat_messages(product_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
