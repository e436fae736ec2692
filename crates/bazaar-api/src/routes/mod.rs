pub mod account;
pub mod auth;
pub mod chat;
pub mod products;
pub mod reports;

use uuid::Uuid;

use bazaar_types::error::{MarketError, MarketResult};

/// Path ids that are not UUIDs cannot name anything.
fn parse_id(raw: &str) -> MarketResult<Uuid> {
    raw.parse().map_err(|_| MarketError::NotFound)
}
