//! Transfer repository for the append-only `transfers` table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, parse_column, parse_timestamp, Database, DatabaseError};
use crate::model::{PickerIdentity, TagVerificationResult, Transfer};

const COLUMNS: &str = "id, item_id, operator_id, forwarder, picker_name, picker_id_number,
     picker_car_plate, tag_storage_location, tag_part_number, tag_serial_number, tag_matched,
     tag_photo_ref, notes, transferred_at";

/// A raw transfer row from the database.
#[derive(Debug, Clone)]
struct TransferRow {
    id: String,
    item_id: String,
    operator_id: String,
    forwarder: String,
    picker_name: String,
    picker_id_number: String,
    picker_car_plate: Option<String>,
    tag_storage_location: String,
    tag_part_number: String,
    tag_serial_number: String,
    tag_matched: bool,
    tag_photo_ref: Option<String>,
    notes: Option<String>,
    transferred_at: String,
}

impl TransferRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            item_id: row.get("item_id")?,
            operator_id: row.get("operator_id")?,
            forwarder: row.get("forwarder")?,
            picker_name: row.get("picker_name")?,
            picker_id_number: row.get("picker_id_number")?,
            picker_car_plate: row.get("picker_car_plate")?,
            tag_storage_location: row.get("tag_storage_location")?,
            tag_part_number: row.get("tag_part_number")?,
            tag_serial_number: row.get("tag_serial_number")?,
            tag_matched: row.get("tag_matched")?,
            tag_photo_ref: row.get("tag_photo_ref")?,
            notes: row.get("notes")?,
            transferred_at: row.get("transferred_at")?,
        })
    }

    fn into_transfer(self) -> Result<Transfer, DatabaseError> {
        Ok(Transfer {
            forwarder: parse_column("forwarder", &self.forwarder)?,
            transferred_at: parse_timestamp("transferred_at", &self.transferred_at)?,
            id: self.id,
            item_id: self.item_id,
            operator_id: self.operator_id,
            picker: PickerIdentity {
                name: self.picker_name,
                id_number: self.picker_id_number,
                car_plate: self.picker_car_plate,
            },
            tag_verification: TagVerificationResult {
                storage_location: self.tag_storage_location,
                part_number: self.tag_part_number,
                serial_number: self.tag_serial_number,
                matched: self.tag_matched,
            },
            tag_photo_ref: self.tag_photo_ref,
            notes: self.notes,
        })
    }
}

/// Inserts a transfer on an already-locked connection, so it can join an
/// enclosing transaction.
pub(crate) fn insert_with(conn: &Connection, transfer: &Transfer) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO transfers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            COLUMNS
        ),
        params![
            transfer.id,
            transfer.item_id,
            transfer.operator_id,
            transfer.forwarder.as_str(),
            transfer.picker.name,
            transfer.picker.id_number,
            transfer.picker.car_plate,
            transfer.tag_verification.storage_location,
            transfer.tag_verification.part_number,
            transfer.tag_verification.serial_number,
            transfer.tag_verification.matched,
            transfer.tag_photo_ref,
            transfer.notes,
            format_timestamp(&transfer.transferred_at),
        ],
    )?;
    Ok(())
}

pub fn insert(db: &Database, transfer: &Transfer) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_with(conn, transfer))
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Transfer>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM transfers WHERE id = ?1", COLUMNS),
                params![id],
                TransferRow::from_row,
            )
            .optional()?;
        row.map(TransferRow::into_transfer).transpose()
    })
}

/// The transfer recorded for an item, latest first if an administrative
/// reset allowed more than one.
pub fn find_by_item(db: &Database, item_id: &str) -> Result<Option<Transfer>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM transfers WHERE item_id = ?1
                     ORDER BY transferred_at DESC LIMIT 1",
                    COLUMNS
                ),
                params![item_id],
                TransferRow::from_row,
            )
            .optional()?;
        row.map(TransferRow::into_transfer).transpose()
    })
}

/// Most recent transfers first; `None` returns all of them.
pub fn list_recent(db: &Database, limit: Option<u64>) -> Result<Vec<Transfer>, DatabaseError> {
    db.with_conn(|conn| {
        let limit = limit.map_or(-1, |l| l as i64);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transfers ORDER BY transferred_at DESC, rowid DESC LIMIT ?1",
            COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![limit], TransferRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TransferRow::into_transfer).collect()
    })
}

pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let total: u64 = conn.query_row("SELECT COUNT(*) FROM transfers", [], |r| r.get(0))?;
        Ok(total)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::item_repo;
    use crate::lifecycle::fixtures::sample_item;
    use crate::model::{Forwarder, ItemType};
    use chrono::{Duration, Utc};

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        item_repo::insert(&db, &sample_item(ItemType::Other)).unwrap();
        db
    }

    fn transfer(id: &str, minutes_ago: i64) -> Transfer {
        Transfer {
            id: id.to_string(),
            item_id: "item-1".to_string(),
            operator_id: "desk".to_string(),
            forwarder: Forwarder::Mnx,
            picker: PickerIdentity {
                name: "Chan Tai Man".to_string(),
                id_number: "A1234567".to_string(),
                car_plate: None,
            },
            tag_verification: TagVerificationResult {
                storage_location: "HKG01 01 01 01 A1".to_string(),
                part_number: "PN-4471-AB".to_string(),
                serial_number: "SN-0099812".to_string(),
                matched: true,
            },
            tag_photo_ref: Some("/uploads/tag_item-1_1.jpg".to_string()),
            notes: None,
            transferred_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = setup();
        let original = transfer("t-1", 0);
        insert(&db, &original).unwrap();

        let found = find_by_id(&db, "t-1").unwrap().unwrap();
        assert_eq!(found.forwarder, Forwarder::Mnx);
        assert_eq!(found.picker, original.picker);
        assert!(found.tag_verification.matched);
        assert_eq!(found.tag_photo_ref, original.tag_photo_ref);

        assert!(find_by_id(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_find_by_item() {
        let db = setup();
        assert!(find_by_item(&db, "item-1").unwrap().is_none());

        insert(&db, &transfer("t-1", 0)).unwrap();
        assert_eq!(find_by_item(&db, "item-1").unwrap().unwrap().id, "t-1");
    }

    #[test]
    fn test_list_recent_newest_first() {
        let db = setup();
        insert(&db, &transfer("old", 30)).unwrap();
        insert(&db, &transfer("new", 1)).unwrap();
        insert(&db, &transfer("mid", 10)).unwrap();

        let ids: Vec<String> = list_recent(&db, None)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);

        assert_eq!(list_recent(&db, Some(2)).unwrap().len(), 2);
        assert_eq!(count(&db).unwrap(), 3);
    }

    #[test]
    fn test_transfer_requires_existing_item() {
        let db = Database::open_in_memory().unwrap();
        assert!(insert(&db, &transfer("t-1", 0)).is_err());
    }
}
