//! Aggregate queries backing the admin dashboard.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use super::{format_timestamp, parse_column, Database, DatabaseError};
use crate::model::{Forwarder, ItemStatus};

/// Items created on one day in one status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatusCount {
    /// `YYYY-MM-DD` (UTC).
    pub date: String,
    pub status: ItemStatus,
    pub count: u64,
}

/// Number of items per status. Statuses without items are omitted.
pub fn status_counts(db: &Database) -> Result<Vec<(ItemStatus, u64)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM items GROUP BY status")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = rows
            .into_iter()
            .map(|(status, count)| Ok((parse_column::<ItemStatus>("status", &status)?, count)))
            .collect::<Result<Vec<_>, DatabaseError>>()?;
        counts.sort_by_key(|(status, _)| *status);
        Ok(counts)
    })
}

/// Number of items per assigned forwarder, most used first.
pub fn forwarder_counts(db: &Database) -> Result<Vec<(Forwarder, u64)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT forwarder, COUNT(*) AS n FROM items WHERE forwarder IS NOT NULL
             GROUP BY forwarder ORDER BY n DESC, forwarder",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(forwarder, count)| Ok((parse_column("forwarder", &forwarder)?, count)))
            .collect()
    })
}

/// Items created since `since`, grouped by UTC day and current status.
pub fn daily_status_counts(
    db: &Database,
    since: DateTime<Utc>,
) -> Result<Vec<DailyStatusCount>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT substr(created_at, 1, 10) AS day, status, COUNT(*) FROM items
             WHERE created_at >= ?1
             GROUP BY day, status ORDER BY day, status",
        )?;
        let rows = stmt
            .query_map(params![format_timestamp(&since)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(date, status, count)| {
                Ok(DailyStatusCount {
                    date,
                    status: parse_column("status", &status)?,
                    count,
                })
            })
            .collect()
    })
}
