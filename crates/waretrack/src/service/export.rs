use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::info;

use super::admin::{end_of_day, parse_filters, start_of_day};
use super::WarehouseService;
use crate::db::item_repo::{self, ItemFilter};
use crate::db::transfer_repo;
use crate::error::Result;
use crate::lifecycle;
use crate::model::Actor;

const HEADER: [&str; 18] = [
    "MBV ID",
    "Storage Location",
    "Part Number",
    "Serial Number",
    "Item Type",
    "Status",
    "Forwarder",
    "Operator",
    "Created At",
    "Updated At",
    "Processed At",
    "Shipped At",
    "Picker Name",
    "Picker ID",
    "Picker Car Plate",
    "Transfer Date",
    "Transfer Operator",
    "Tag Verification Match",
];

/// Export filters. Unlike the listing there is no recent-window default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<String>,
    pub forwarder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// `warehouse_items_export_<YYYY-MM-DD>.csv`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("warehouse_items_export_{}.csv", now.format("%Y-%m-%d"))
}

fn timestamp(value: Option<&DateTime<Utc>>) -> String {
    value
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

impl WarehouseService {
    /// One CSV row per matching item, newest first, joined with its transfer.
    pub fn export_csv(&self, query: &ExportQuery, actor: &Actor) -> Result<CsvExport> {
        lifecycle::ensure_admin(actor)?;

        let (status, forwarder) = parse_filters(query.status.as_deref(), query.forwarder.as_deref())?;
        let filter = ItemFilter {
            status,
            forwarder,
            created_from: query.date_from.map(start_of_day),
            created_to: query.date_to.map(end_of_day).transpose()?,
            ..Default::default()
        };
        let (items, total) = item_repo::query(&self.db, &filter)?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(HEADER)?;

        for item in &items {
            let transfer = transfer_repo::find_by_item(&self.db, &item.id)?;
            let (picker_name, picker_id, car_plate, transfer_date, transfer_operator, matched) =
                match &transfer {
                    Some(t) => (
                        t.picker.name.clone(),
                        t.picker.id_number.clone(),
                        t.picker.car_plate.clone().unwrap_or_default(),
                        timestamp(Some(&t.transferred_at)),
                        t.operator_id.clone(),
                        if t.tag_verification.matched { "Yes" } else { "No" }.to_string(),
                    ),
                    None => Default::default(),
                };

            writer.write_record([
                item.tracking_code.clone(),
                item.storage_location.clone(),
                item.part_number.clone(),
                item.serial_number.clone(),
                item.item_type.to_string(),
                item.status.to_string(),
                item.forwarder.map(|f| f.to_string()).unwrap_or_default(),
                item.operator_id.clone(),
                timestamp(Some(&item.created_at)),
                timestamp(Some(&item.updated_at)),
                timestamp(item.processed_at.as_ref()),
                timestamp(item.shipped_at.as_ref()),
                picker_name,
                picker_id,
                car_plate,
                transfer_date,
                transfer_operator,
                matched,
            ])?;
        }

        let content = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;

        info!(rows = total, admin = %actor.user_id, "Items exported");
        Ok(CsvExport {
            file_name: export_file_name(Utc::now()),
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_export_file_name_uses_date() {
        let now = Utc.with_ymd_and_hms(2026, 7, 4, 23, 10, 0).unwrap();
        assert_eq!(export_file_name(now), "warehouse_items_export_2026-07-04.csv");
    }

    #[test]
    fn test_missing_timestamp_is_blank() {
        assert_eq!(timestamp(None), "");
        let ts = Utc.with_ymd_and_hms(2026, 7, 4, 8, 0, 0).unwrap();
        assert_eq!(timestamp(Some(&ts)), "2026-07-04T08:00:00.000Z");
    }
}
