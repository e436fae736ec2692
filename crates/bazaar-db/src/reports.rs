use anyhow::Result;

use crate::Database;

impl Database {
    pub fn insert_report(
        &self,
        id: &str,
        reporter_id: &str,
        target_kind: &str,
        target_id: &str,
        reason: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reports (id, reporter_id, target_kind, target_id, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, reporter_id, target_kind, target_id, reason],
            )?;
            Ok(())
        })
    }

    /// Every report row naming this target, whoever filed it.
    pub fn count_reports_for(&self, target_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM reports WHERE target_id = ?1",
                [target_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}
