//! Item repository: the `items` table plus its history and photo rows.
//!
//! Writes are guarded by the `version` column. [`update_versioned`] only
//! succeeds when the stored version still equals the one the caller read.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::json;

use super::{
    format_timestamp, parse_column, parse_optional_timestamp, parse_timestamp, transfer_repo,
    Database, DatabaseError,
};
use crate::model::{Checklist, Forwarder, HistoryEntry, Item, ItemStatus, Operation, Transfer};

const COLUMNS: &str = "id, tracking_code, storage_location, part_number, serial_number,
     item_type, forwarder, status, checklist, operator_id, mbv_image_ref,
     tag_verification_photo, created_at, updated_at, processed_at, available_at, shipped_at,
     version";

/// A raw item row from the database.
#[derive(Debug, Clone)]
struct ItemRow {
    id: String,
    tracking_code: String,
    storage_location: String,
    part_number: String,
    serial_number: String,
    item_type: String,
    forwarder: Option<String>,
    status: String,
    checklist: String,
    operator_id: String,
    mbv_image_ref: Option<String>,
    tag_verification_photo: Option<String>,
    created_at: String,
    updated_at: String,
    processed_at: Option<String>,
    available_at: Option<String>,
    shipped_at: Option<String>,
    version: i64,
}

impl ItemRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            tracking_code: row.get("tracking_code")?,
            storage_location: row.get("storage_location")?,
            part_number: row.get("part_number")?,
            serial_number: row.get("serial_number")?,
            item_type: row.get("item_type")?,
            forwarder: row.get("forwarder")?,
            status: row.get("status")?,
            checklist: row.get("checklist")?,
            operator_id: row.get("operator_id")?,
            mbv_image_ref: row.get("mbv_image_ref")?,
            tag_verification_photo: row.get("tag_verification_photo")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            processed_at: row.get("processed_at")?,
            available_at: row.get("available_at")?,
            shipped_at: row.get("shipped_at")?,
            version: row.get("version")?,
        })
    }

    fn into_item(
        self,
        history: Vec<HistoryEntry>,
        photos: Vec<String>,
    ) -> Result<Item, DatabaseError> {
        let checklist: Checklist = serde_json::from_str(&self.checklist)?;
        let forwarder = self
            .forwarder
            .as_deref()
            .map(|f| parse_column::<Forwarder>("forwarder", f))
            .transpose()?;

        Ok(Item {
            item_type: parse_column("item_type", &self.item_type)?,
            status: parse_column("status", &self.status)?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            processed_at: parse_optional_timestamp("processed_at", self.processed_at)?,
            available_at: parse_optional_timestamp("available_at", self.available_at)?,
            shipped_at: parse_optional_timestamp("shipped_at", self.shipped_at)?,
            id: self.id,
            tracking_code: self.tracking_code,
            storage_location: self.storage_location,
            part_number: self.part_number,
            serial_number: self.serial_number,
            forwarder,
            checklist,
            operator_id: self.operator_id,
            mbv_image_ref: self.mbv_image_ref,
            photos,
            tag_verification_photo: self.tag_verification_photo,
            history,
            version: self.version,
        })
    }
}

/// Which descriptive field a text search covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchField {
    SerialNumber,
    PartNumber,
    #[default]
    Both,
}

/// Query filter parameters for item listing.
#[derive(Debug, Default, Clone)]
pub struct ItemFilter {
    pub status: Option<ItemStatus>,
    pub forwarder: Option<Forwarder>,
    pub operator_id: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    /// Case-insensitive substring search.
    pub search: Option<String>,
    pub search_field: SearchField,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// The history and photo rows a versioned write appends.
#[derive(Debug, Clone, Copy)]
pub struct PendingWrite<'a> {
    pub item: &'a Item,
    /// Version read before the item was mutated.
    pub expected_version: i64,
    pub new_history: &'a [HistoryEntry],
    pub new_photos: &'a [String],
    pub transfer: Option<&'a Transfer>,
}

fn insert_history(
    conn: &Connection,
    item_id: &str,
    entries: &[HistoryEntry],
) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO item_history (item_id, operation, actor_id, details, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for entry in entries {
        let mut encoded = serde_json::to_value(&entry.operation)?;
        let details = encoded
            .get_mut("details")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);
        stmt.execute(params![
            item_id,
            entry.operation.tag(),
            entry.actor_id,
            details.to_string(),
            format_timestamp(&entry.timestamp),
        ])?;
    }
    Ok(())
}

fn insert_photos(conn: &Connection, item_id: &str, photos: &[String]) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare("INSERT INTO item_photos (item_id, photo_ref) VALUES (?1, ?2)")?;
    for photo in photos {
        stmt.execute(params![item_id, photo])?;
    }
    Ok(())
}

fn load_history(conn: &Connection, item_id: &str) -> Result<Vec<HistoryEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT operation, actor_id, details, timestamp FROM item_history
         WHERE item_id = ?1 ORDER BY seq",
    )?;
    let rows = stmt
        .query_map(params![item_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(tag, actor_id, details, timestamp)| {
            let details: serde_json::Value = serde_json::from_str(&details)?;
            let operation: Operation =
                serde_json::from_value(json!({ "operation": &tag, "details": details }))
                    .map_err(|_| DatabaseError::InvalidValue {
                        column: "operation",
                        value: tag.clone(),
                    })?;
            Ok(HistoryEntry {
                operation,
                actor_id,
                timestamp: parse_timestamp("timestamp", &timestamp)?,
            })
        })
        .collect()
}

fn load_photos(conn: &Connection, item_id: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT photo_ref FROM item_photos WHERE item_id = ?1 ORDER BY seq")?;
    let photos = stmt
        .query_map(params![item_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(photos)
}

fn hydrate(conn: &Connection, row: ItemRow) -> Result<Item, DatabaseError> {
    let history = load_history(conn, &row.id)?;
    let photos = load_photos(conn, &row.id)?;
    row.into_item(history, photos)
}

fn find_one(
    conn: &Connection,
    column: &'static str,
    value: &str,
) -> Result<Option<Item>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM items WHERE {} = ?1", COLUMNS, column),
            params![value],
            ItemRow::from_row,
        )
        .optional()?;
    row.map(|r| hydrate(conn, r)).transpose()
}

fn query_items(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<Item>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, ItemRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(|row| hydrate(conn, row)).collect()
}

/// Inserts a new item with its initial history and photos.
pub fn insert(db: &Database, item: &Item) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                 ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                COLUMNS
            ),
            params![
                item.id,
                item.tracking_code,
                item.storage_location,
                item.part_number,
                item.serial_number,
                item.item_type.as_str(),
                item.forwarder.map(|f| f.as_str()),
                item.status.as_str(),
                serde_json::to_string(&item.checklist)?,
                item.operator_id,
                item.mbv_image_ref,
                item.tag_verification_photo,
                format_timestamp(&item.created_at),
                format_timestamp(&item.updated_at),
                item.processed_at.as_ref().map(format_timestamp),
                item.available_at.as_ref().map(format_timestamp),
                item.shipped_at.as_ref().map(format_timestamp),
                item.version,
            ],
        )?;
        insert_history(&tx, &item.id, &item.history)?;
        insert_photos(&tx, &item.id, &item.photos)?;
        tx.commit()?;
        Ok(())
    })
}

/// Compare-and-set write of a mutated item.
///
/// Updates the row only if its version is still `expected_version`, then
/// appends the new history and photo rows and the optional transfer, all in
/// one transaction. Returns `false` without writing anything when another
/// writer got there first.
pub fn update_versioned(db: &Database, write: PendingWrite<'_>) -> Result<bool, DatabaseError> {
    let item = write.item;
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let updated = tx.execute(
            "UPDATE items SET storage_location = ?3, part_number = ?4, serial_number = ?5,
             item_type = ?6, forwarder = ?7, status = ?8, checklist = ?9,
             mbv_image_ref = ?10, tag_verification_photo = ?11, updated_at = ?12,
             processed_at = ?13, available_at = ?14, shipped_at = ?15, version = version + 1
             WHERE id = ?1 AND version = ?2",
            params![
                item.id,
                write.expected_version,
                item.storage_location,
                item.part_number,
                item.serial_number,
                item.item_type.as_str(),
                item.forwarder.map(|f| f.as_str()),
                item.status.as_str(),
                serde_json::to_string(&item.checklist)?,
                item.mbv_image_ref,
                item.tag_verification_photo,
                format_timestamp(&item.updated_at),
                item.processed_at.as_ref().map(format_timestamp),
                item.available_at.as_ref().map(format_timestamp),
                item.shipped_at.as_ref().map(format_timestamp),
            ],
        )?;

        if updated == 0 {
            log::debug!(
                "Version check failed for item {} (expected v{})",
                item.id,
                write.expected_version
            );
            return Ok(false);
        }

        insert_history(&tx, &item.id, write.new_history)?;
        insert_photos(&tx, &item.id, write.new_photos)?;
        if let Some(transfer) = write.transfer {
            transfer_repo::insert_with(&tx, transfer)?;
        }
        tx.commit()?;
        Ok(true)
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Item>, DatabaseError> {
    db.with_conn(|conn| find_one(conn, "id", id))
}

pub fn find_by_tracking_code(db: &Database, code: &str) -> Result<Option<Item>, DatabaseError> {
    db.with_conn(|conn| find_one(conn, "tracking_code", code))
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Queries items with filters, newest first, returning (items, total_count).
pub fn query(db: &Database, filter: &ItemFilter) -> Result<(Vec<Item>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = Vec::new();
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status.as_str()));
        }
        if let Some(forwarder) = filter.forwarder {
            conditions.push(format!("forwarder = ?{}", param_values.len() + 1));
            param_values.push(Box::new(forwarder.as_str()));
        }
        if let Some(ref operator_id) = filter.operator_id {
            conditions.push(format!("operator_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(operator_id.clone()));
        }
        if let Some(ref from) = filter.created_from {
            conditions.push(format!("created_at >= ?{}", param_values.len() + 1));
            param_values.push(Box::new(format_timestamp(from)));
        }
        if let Some(ref to) = filter.created_to {
            conditions.push(format!("created_at <= ?{}", param_values.len() + 1));
            param_values.push(Box::new(format_timestamp(to)));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let index = param_values.len() + 1;
            let condition = match filter.search_field {
                SearchField::SerialNumber => format!("serial_number LIKE ?{} ESCAPE '\\'", index),
                SearchField::PartNumber => format!("part_number LIKE ?{} ESCAPE '\\'", index),
                SearchField::Both => format!(
                    "(serial_number LIKE ?{0} ESCAPE '\\' OR part_number LIKE ?{0} ESCAPE '\\')",
                    index
                ),
            };
            conditions.push(condition);
            param_values.push(Box::new(like_pattern(search)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM items {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        let limit = filter.limit.map_or(-1, |l| l as i64);
        let offset = filter.offset.unwrap_or(0) as i64;
        param_values.push(Box::new(limit));
        param_values.push(Box::new(offset));
        let query_sql = format!(
            "SELECT {} FROM items {} ORDER BY created_at DESC, rowid DESC LIMIT ?{} OFFSET ?{}",
            COLUMNS,
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let items = query_items(conn, &query_sql, params_ref.as_slice())?;

        Ok((items, total))
    })
}

/// Items waiting for pickup by `forwarder`, most recently made available first.
pub fn list_available_by_forwarder(
    db: &Database,
    forwarder: Forwarder,
) -> Result<Vec<Item>, DatabaseError> {
    db.with_conn(|conn| {
        let sql = format!(
            "SELECT {} FROM items WHERE status = ?1 AND forwarder = ?2
             ORDER BY available_at DESC, rowid DESC",
            COLUMNS
        );
        query_items(
            conn,
            &sql,
            params![ItemStatus::AvailableForPickup.as_str(), forwarder.as_str()],
        )
    })
}

/// Carriers with at least one item available for pickup, sorted by name.
pub fn count_available_by_forwarder(db: &Database) -> Result<Vec<(Forwarder, u64)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT forwarder, COUNT(*) FROM items
             WHERE status = ?1 AND forwarder IS NOT NULL
             GROUP BY forwarder ORDER BY forwarder",
        )?;
        let rows = stmt
            .query_map(params![ItemStatus::AvailableForPickup.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(name, count)| Ok((parse_column("forwarder", &name)?, count)))
            .collect()
    })
}

/// Result of [`delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// A transfer references the item; nothing was deleted.
    HasTransfer,
}

/// Deletes an item with its history and photos, unless a transfer
/// references it. The check and the delete are one statement.
pub fn delete(db: &Database, id: &str) -> Result<DeleteOutcome, DatabaseError> {
    db.with_conn(|conn| {
        let deleted = conn.execute(
            "DELETE FROM items WHERE id = ?1
             AND NOT EXISTS (SELECT 1 FROM transfers WHERE item_id = ?1)",
            params![id],
        )?;
        if deleted > 0 {
            return Ok(DeleteOutcome::Deleted);
        }

        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM items WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(if exists {
            DeleteOutcome::HasTransfer
        } else {
            DeleteOutcome::NotFound
        })
    })
}
