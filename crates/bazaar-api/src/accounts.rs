use uuid::Uuid;

use bazaar_db::Database;
use bazaar_types::error::{MarketError, MarketResult};
use bazaar_types::models::User;

pub fn load_user(db: &Database, id: Uuid) -> MarketResult<User> {
    let row = db
        .get_user_by_id(&id.to_string())?
        .ok_or(MarketError::NotFound)?;
    Ok(row.into_user()?)
}

/// Replace the profile bio. Blank text clears it.
pub fn update_bio(db: &Database, id: Uuid, bio: &str) -> MarketResult<()> {
    let bio = bio.trim();
    let bio = (!bio.is_empty()).then_some(bio);
    if !db.update_bio(&id.to_string(), bio)? {
        return Err(MarketError::NotFound);
    }
    Ok(())
}
