//! Append-only operation history.
//!
//! Entries are only ever pushed to the end of [`Item::history`]; nothing in the
//! crate edits or removes them.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Actor, HistoryEntry, Item, ItemStatus, Operation};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplayError {
    #[error("History does not start with an item_created entry")]
    MissingCreation,

    #[error("Entry {index} moves from {recorded} but the replayed status is {replayed}")]
    Discontinuity {
        index: usize,
        recorded: ItemStatus,
        replayed: ItemStatus,
    },
}

/// Appends a timestamped entry and bumps `updated_at`.
pub fn append(item: &mut Item, actor: &Actor, operation: Operation, now: DateTime<Utc>) {
    item.history.push(HistoryEntry {
        operation,
        actor_id: actor.user_id.clone(),
        timestamp: now,
    });
    item.updated_at = now;
}

/// Recomputes the sequence of statuses an item went through, from its
/// history alone. The first element is the status at creation.
pub fn replay_statuses(history: &[HistoryEntry]) -> Result<Vec<ItemStatus>, ReplayError> {
    let mut entries = history.iter().enumerate();

    let mut current = match entries.next() {
        Some((_, entry)) => match &entry.operation {
            Operation::ItemCreated { status, .. } => *status,
            _ => return Err(ReplayError::MissingCreation),
        },
        None => return Err(ReplayError::MissingCreation),
    };

    let mut statuses = vec![current];
    for (index, entry) in entries {
        if let Some((old, new)) = entry.operation.status_change() {
            if old != current {
                return Err(ReplayError::Discontinuity {
                    index,
                    recorded: old,
                    replayed: current,
                });
            }
            current = new;
            statuses.push(new);
        }
    }

    Ok(statuses)
}

/// Entries appended after the first `persisted` ones.
pub fn appended_since(item: &Item, persisted: usize) -> &[HistoryEntry] {
    item.history.get(persisted..).unwrap_or(&[])
}
