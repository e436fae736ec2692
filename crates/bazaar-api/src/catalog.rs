//! Product listings. Every mutation is scoped to the product's owner.

use tracing::info;
use uuid::Uuid;

use bazaar_db::Database;
use bazaar_db::models::ProductRow;
use bazaar_types::error::{MarketError, MarketResult};
use bazaar_types::models::{Price, Product};

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub image_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProductChanges {
    pub title: String,
    pub description: String,
    pub price: Price,
}

pub fn parse_price(text: &str) -> MarketResult<Price> {
    text.parse()
        .map_err(|_| MarketError::InvalidInput(format!("'{}' is not a valid price", text.trim())))
}

pub fn require_title(title: &str) -> MarketResult<()> {
    if title.trim().is_empty() {
        return Err(MarketError::InvalidInput("a title is required".into()));
    }
    Ok(())
}

pub fn create(db: &Database, owner_id: Uuid, product: NewProduct) -> MarketResult<Uuid> {
    require_title(&product.title)?;

    let id = Uuid::new_v4();
    db.insert_product(&ProductRow {
        id: id.to_string(),
        owner_id: owner_id.to_string(),
        title: product.title.trim().to_string(),
        description: product.description,
        price_cents: product.price.cents(),
        image_key: product.image_key,
        created_at: String::new(),
    })?;

    info!("User {} listed product {}", owner_id, id);
    Ok(id)
}

/// Apply edits if `owner_id` owns the product. A missing product and someone
/// else's product are both `NotOwner`.
pub fn update(
    db: &Database,
    product_id: Uuid,
    owner_id: Uuid,
    changes: ProductChanges,
) -> MarketResult<()> {
    require_title(&changes.title)?;

    let updated = db.update_product(
        &product_id.to_string(),
        &owner_id.to_string(),
        changes.title.trim(),
        &changes.description,
        changes.price.cents(),
    )?;

    if !updated {
        return Err(MarketError::NotOwner);
    }
    info!("User {} updated product {}", owner_id, product_id);
    Ok(())
}

pub fn delete(db: &Database, product_id: Uuid, owner_id: Uuid) -> MarketResult<()> {
    if !db.delete_product(&product_id.to_string(), &owner_id.to_string())? {
        return Err(MarketError::NotOwner);
    }
    info!("User {} deleted product {}", owner_id, product_id);
    Ok(())
}

pub fn get(db: &Database, product_id: Uuid) -> MarketResult<Product> {
    let row = db
        .get_product(&product_id.to_string())?
        .ok_or(MarketError::NotFound)?;
    Ok(row.into_product()?)
}

/// Fetch a product for editing; fails with `NotOwner` unless `owner_id` owns it.
pub fn owned(db: &Database, product_id: Uuid, owner_id: Uuid) -> MarketResult<Product> {
    match get(db, product_id) {
        Ok(product) if product.owner_id == owner_id => Ok(product),
        Ok(_) | Err(MarketError::NotFound) => Err(MarketError::NotOwner),
        Err(e) => Err(e),
    }
}

pub fn list_all(db: &Database) -> MarketResult<Vec<Product>> {
    into_products(db.list_products()?)
}

pub fn list_by_owner(db: &Database, owner_id: Uuid) -> MarketResult<Vec<Product>> {
    into_products(db.list_products_by_owner(&owner_id.to_string())?)
}

fn into_products(rows: Vec<ProductRow>) -> MarketResult<Vec<Product>> {
    let products = rows
        .into_iter()
        .map(ProductRow::into_product)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(products)
}
