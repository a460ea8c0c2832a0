use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ForwarderCount, ItemUpdate, WarehouseService};
use crate::db::item_repo::{self, DeleteOutcome, ItemFilter, SearchField};
use crate::db::stats_repo::{self, DailyStatusCount};
use crate::db::transfer_repo;
use crate::error::{Result, WaretrackError};
use crate::lifecycle;
use crate::model::{Actor, Forwarder, Item, ItemStatus, Transfer};

/// Days covered by the dashboard's items-over-time series.
const DASHBOARD_DAYS: i64 = 30;
const DASHBOARD_RECENT_TRANSFERS: u64 = 10;

/// Filters for the administrative item listing. String fields take the
/// same values the API exposes and are validated on use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemQuery {
    pub status: Option<String>,
    pub forwarder: Option<String>,
    pub date_from: Option<NaiveDate>,
    /// Inclusive through the end of the day.
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
    /// `sn`, `pn` or `both` (default).
    pub search_type: Option<String>,
    /// Disables the recent-window default when no dates are given.
    pub show_all: bool,
    /// 1-based.
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub total: u64,
    pub total_pages: u64,
    pub page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: ItemStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_items: u64,
    /// One entry per status, zero counts included.
    pub status_counts: Vec<StatusCount>,
    pub total_transfers: u64,
    pub items_by_forwarder: Vec<ForwarderCount>,
    pub items_over_time: Vec<DailyStatusCount>,
    pub recent_transfers: Vec<Transfer>,
}

fn parse_search_field(value: Option<&str>) -> Result<SearchField> {
    match value.map(str::trim) {
        None | Some("") | Some("both") => Ok(SearchField::Both),
        Some("sn") => Ok(SearchField::SerialNumber),
        Some("pn") => Ok(SearchField::PartNumber),
        Some(other) => Err(WaretrackError::validation(format!(
            "Invalid search type '{}' (expected sn, pn or both)",
            other
        ))),
    }
}

pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub(crate) fn end_of_day(date: NaiveDate) -> Result<DateTime<Utc>> {
    date.and_hms_micro_opt(23, 59, 59, 999_999)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| WaretrackError::validation(format!("Invalid date {}", date)))
}

/// Status and forwarder filters shared by the listing and the export.
pub(crate) fn parse_filters(
    status: Option<&str>,
    forwarder: Option<&str>,
) -> Result<(Option<ItemStatus>, Option<Forwarder>)> {
    let status = status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<ItemStatus>)
        .transpose()?;
    let forwarder = forwarder
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::parse::<Forwarder>)
        .transpose()?;
    Ok((status, forwarder))
}

impl WarehouseService {
    /// Paginated item listing. Without dates and without `show_all`, only
    /// items created within the configured recent window are included.
    pub fn list_items(&self, query: &ItemQuery, actor: &Actor) -> Result<ItemPage> {
        lifecycle::ensure_admin(actor)?;

        let (status, forwarder) = parse_filters(query.status.as_deref(), query.forwarder.as_deref())?;
        let search_field = parse_search_field(query.search_type.as_deref())?;

        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(self.config.listing.page_size);
        if page == 0 || limit == 0 {
            return Err(WaretrackError::validation(
                "page and limit must be positive",
            ));
        }

        let mut filter = ItemFilter {
            status,
            forwarder,
            search: query.search.clone(),
            search_field,
            limit: Some(u64::from(limit)),
            offset: Some(u64::from(page - 1) * u64::from(limit)),
            ..Default::default()
        };

        match (query.date_from, query.date_to) {
            (None, None) if !query.show_all => {
                let window = Duration::hours(i64::from(self.config.listing.recent_window_hours));
                filter.created_from = Some(Utc::now() - window);
            }
            (from, to) => {
                filter.created_from = from.map(start_of_day);
                filter.created_to = to.map(end_of_day).transpose()?;
            }
        }

        let (items, total) = item_repo::query(&self.db, &filter)?;
        Ok(ItemPage {
            items,
            total,
            total_pages: total.div_ceil(u64::from(limit)),
            page,
        })
    }

    /// Sets any status directly, bypassing every guard.
    pub fn admin_set_status(&self, id: &str, status: &str, actor: &Actor) -> Result<ItemUpdate> {
        lifecycle::ensure_admin(actor)?;
        let status: ItemStatus = status.parse()?;

        let (item, change) = self.mutate(id, "admin_set_status", |item| {
            lifecycle::admin_set_status(item, status, actor)
        })?;
        Ok(ItemUpdate {
            item,
            status_change: Some(change),
        })
    }

    /// Deletes an item with its history. Items that were handed over keep
    /// their transfer record, so they cannot be deleted.
    pub fn delete_item(&self, id: &str, actor: &Actor) -> Result<()> {
        lifecycle::ensure_admin(actor)?;
        let item = self.load_item(id)?;

        match item_repo::delete(&self.db, id)? {
            DeleteOutcome::Deleted => {}
            DeleteOutcome::NotFound => return Err(WaretrackError::item_not_found(id)),
            DeleteOutcome::HasTransfer => {
                return Err(WaretrackError::Conflict(
                    "Cannot delete item with associated transfers".to_string(),
                ))
            }
        }

        info!(
            item = %item.tracking_code,
            admin = %actor.user_id,
            "Item deleted"
        );
        Ok(())
    }

    pub fn dashboard(&self, actor: &Actor) -> Result<Dashboard> {
        lifecycle::ensure_admin(actor)?;

        let stored = stats_repo::status_counts(&self.db)?;
        let status_counts: Vec<StatusCount> = ItemStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: stored
                    .iter()
                    .find(|(s, _)| *s == status)
                    .map_or(0, |(_, count)| *count),
            })
            .collect();
        let total_items = status_counts.iter().map(|s| s.count).sum();

        let items_by_forwarder = stats_repo::forwarder_counts(&self.db)?
            .into_iter()
            .map(|(forwarder, count)| ForwarderCount { forwarder, count })
            .collect();

        let since = Utc::now() - Duration::days(DASHBOARD_DAYS);

        Ok(Dashboard {
            total_items,
            status_counts,
            total_transfers: transfer_repo::count(&self.db)?,
            items_by_forwarder,
            items_over_time: stats_repo::daily_status_counts(&self.db, since)?,
            recent_transfers: transfer_repo::list_recent(
                &self.db,
                Some(DASHBOARD_RECENT_TRANSFERS),
            )?,
        })
    }
}
