use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Database;
use crate::models::ProductRow;

const PRODUCT_COLUMNS: &str = "id, owner_id, title, description, price_cents, image_key, created_at";

impl Database {
    pub fn insert_product(&self, row: &ProductRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO products (id, owner_id, title, description, price_cents, image_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    row.id,
                    row.owner_id,
                    row.title,
                    row.description,
                    row.price_cents,
                    row.image_key
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_product(&self, id: &str) -> Result<Option<ProductRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS),
                    [id],
                    product_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn product_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM products WHERE id = ?1", [id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// All products, newest first.
    pub fn list_products(&self) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| query_products(conn, None))
    }

    pub fn list_products_by_owner(&self, owner_id: &str) -> Result<Vec<ProductRow>> {
        self.with_conn(|conn| query_products(conn, Some(owner_id)))
    }

    /// Update the editable fields of a product owned by `owner_id`.
    /// Returns `false` if no product has both this id and this owner.
    pub fn update_product(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
        description: &str,
        price_cents: i64,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE products SET title = ?1, description = ?2, price_cents = ?3
                 WHERE id = ?4 AND owner_id = ?5",
                rusqlite::params![title, description, price_cents, id, owner_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Same ownership rule as [`Database::update_product`].
    pub fn delete_product(&self, id: &str, owner_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM products WHERE id = ?1 AND owner_id = ?2",
                (id, owner_id),
            )?;
            Ok(removed > 0)
        })
    }
}

fn query_products(conn: &Connection, owner_id: Option<&str>) -> Result<Vec<ProductRow>> {
    let rows = match owner_id {
        Some(owner_id) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM products WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
                PRODUCT_COLUMNS
            ))?;
            stmt.query_map([owner_id], product_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM products ORDER BY created_at DESC, rowid DESC",
                PRODUCT_COLUMNS
            ))?;
            stmt.query_map([], product_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(rows)
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<ProductRow> {
    Ok(ProductRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        price_cents: row.get(4)?,
        image_key: row.get(5)?,
        created_at: row.get(6)?,
    })
}
