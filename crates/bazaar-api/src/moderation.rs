//! Abuse reports and the dormant-account rule.

use tracing::{info, warn};
use uuid::Uuid;

use bazaar_db::Database;
use bazaar_types::error::MarketResult;
use bazaar_types::models::TargetRef;

/// Reports against one user that make the account dormant.
pub const DORMANT_THRESHOLD: u64 = 5;

#[derive(Debug, Clone)]
pub struct FiledReport {
    pub id: Uuid,
    pub target: TargetRef,
    /// Reports on record for the target, this one included
    pub count: u64,
    /// Whether this report moved the target user to dormant
    pub made_dormant: bool,
}

/// Work out what a submitted target id refers to. Anything that is not a
/// known user or product is kept verbatim as `Unknown`.
pub fn classify(db: &Database, raw: &str) -> MarketResult<TargetRef> {
    let raw = raw.trim();
    let Ok(id) = raw.parse::<Uuid>() else {
        return Ok(TargetRef::Unknown(raw.to_string()));
    };

    let key = id.to_string();
    if db.user_exists(&key)? {
        Ok(TargetRef::User(id))
    } else if db.product_exists(&key)? {
        Ok(TargetRef::Product(id))
    } else {
        Ok(TargetRef::Unknown(key))
    }
}

/// Record a report and apply the dormant rule to user targets.
///
/// Every report is stored: the target does not have to exist and the reason
/// may be empty. The status change runs on every report past the threshold
/// and only takes effect once.
pub fn file(
    db: &Database,
    reporter_id: Uuid,
    raw_target: &str,
    reason: &str,
) -> MarketResult<FiledReport> {
    let target = classify(db, raw_target)?;
    let target_id = target.id();
    let id = Uuid::new_v4();

    db.insert_report(
        &id.to_string(),
        &reporter_id.to_string(),
        target.kind(),
        &target_id,
        reason.trim(),
    )?;
    info!("User {} reported {} {}", reporter_id, target.kind(), target_id);

    let count = db.count_reports_for(&target_id)?;

    let made_dormant = match &target {
        TargetRef::User(user_id) if count >= DORMANT_THRESHOLD => {
            let changed = db.mark_dormant(&user_id.to_string())?;
            if changed {
                let closed = db.delete_sessions_for_user(&user_id.to_string())?;
                warn!(
                    "User {} is now dormant after {} reports ({} sessions closed)",
                    user_id, count, closed
                );
            }
            changed
        }
        TargetRef::User(_) | TargetRef::Product(_) | TargetRef::Unknown(_) => false,
    };

    Ok(FiledReport {
        id,
        target,
        count,
        made_dormant,
    })
}

/// Every report row naming this target, regardless of who filed it or when.
pub fn count_for(db: &Database, target_id: &str) -> MarketResult<u64> {
    let target_id = target_id.trim();
    let key = match target_id.parse::<Uuid>() {
        Ok(id) => id.to_string(),
        Err(_) => target_id.to_string(),
    };
    Ok(db.count_reports_for(&key)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_auth::session::register;
    use bazaar_types::models::AccountStatus;

    fn status(db: &Database, id: Uuid) -> AccountStatus {
        db.get_user_by_id(&id.to_string())
            .unwrap()
            .unwrap()
            .into_user()
            .unwrap()
            .status
    }

    #[test]
    fn fifth_report_makes_user_dormant_once() {
        let db = Database::open_in_memory().unwrap();
        let reporter = register(&db, "reporter", "hunter22").unwrap();
        let target = register(&db, "spammer", "hunter22").unwrap();
        let raw = target.to_string();

        for _ in 0..4 {
            let filed = file(&db, reporter, &raw, "spam").unwrap();
            assert!(!filed.made_dormant);
        }
        assert_eq!(status(&db, target), AccountStatus::Active);

        let fifth = file(&db, reporter, &raw, "spam").unwrap();
        assert_eq!(fifth.count, 5);
        assert!(fifth.made_dormant);
        assert_eq!(status(&db, target), AccountStatus::Dormant);

        let sixth = file(&db, reporter, &raw, "still spam").unwrap();
        assert_eq!(sixth.count, 6);
        assert!(!sixth.made_dormant);
        assert_eq!(status(&db, target), AccountStatus::Dormant);
    }

    #[test]
    fn count_includes_duplicates_from_one_reporter() {
        let db = Database::open_in_memory().unwrap();
        let a = register(&db, "a", "hunter22").unwrap();
        let b = register(&db, "b", "hunter22").unwrap();
        let target = register(&db, "target", "hunter22").unwrap();
        let raw = target.to_string();

        file(&db, a, &raw, "spam").unwrap();
        file(&db, a, &raw, "spam again").unwrap();
        file(&db, b, &raw, "rude").unwrap();

        assert_eq!(count_for(&db, &raw).unwrap(), 3);
        assert_eq!(count_for(&db, &raw.to_uppercase()).unwrap(), 3);
        assert_eq!(count_for(&db, &Uuid::new_v4().to_string()).unwrap(), 0);
    }

    #[test]
    fn products_and_dangling_targets_are_recorded() {
        let db = Database::open_in_memory().unwrap();
        let reporter = register(&db, "reporter", "hunter22").unwrap();

        let dangling = file(&db, reporter, "no-such-thing", "weird").unwrap();
        assert_eq!(dangling.target, TargetRef::Unknown("no-such-thing".into()));

        let ghost = Uuid::new_v4();
        for _ in 0..DORMANT_THRESHOLD {
            let filed = file(&db, reporter, &ghost.to_string(), "fake listing").unwrap();
            assert!(!filed.made_dormant);
        }
        assert_eq!(count_for(&db, &ghost.to_string()).unwrap(), DORMANT_THRESHOLD);
    }

    #[test]
    fn product_reports_never_touch_account_status() {
        let db = Database::open_in_memory().unwrap();
        let reporter = register(&db, "reporter", "hunter22").unwrap();
        let seller = register(&db, "seller", "hunter22").unwrap();
        let product = crate::catalog::create(
            &db,
            seller,
            crate::catalog::NewProduct {
                title: "Fake watch".into(),
                description: "Totally real".into(),
                price: crate::catalog::parse_price("10").unwrap(),
                image_key: None,
            },
        )
        .unwrap();

        for _ in 0..6 {
            let filed = file(&db, reporter, &product.to_string(), "counterfeit").unwrap();
            assert_eq!(filed.target, TargetRef::Product(product));
            assert!(!filed.made_dormant);
        }
        assert_eq!(status(&db, seller), AccountStatus::Active);
    }

    #[test]
    fn blank_reason_still_counts() {
        let db = Database::open_in_memory().unwrap();
        let reporter = register(&db, "reporter", "hunter22").unwrap();
        let target = register(&db, "target", "hunter22").unwrap();

        let filed = file(&db, reporter, &target.to_string(), "").unwrap();
        assert_eq!(filed.target, TargetRef::User(target));
        assert_eq!(filed.count, 1);
        assert_eq!(count_for(&db, &target.to_string()).unwrap(), 1);
    }

    #[test]
    fn blank_target_is_stored_as_unknown() {
        let db = Database::open_in_memory().unwrap();
        let reporter = register(&db, "reporter", "hunter22").unwrap();

        let filed = file(&db, reporter, "   ", "no idea").unwrap();
        assert_eq!(filed.target, TargetRef::Unknown(String::new()));
        assert_eq!(count_for(&db, "").unwrap(), 1);
    }
}
