pub mod actor;
pub mod history;
pub mod item;
pub mod transfer;

pub use actor::{Actor, Role};
pub use history::{FieldChanges, HistoryEntry, Operation};
pub use item::{Checklist, ChecklistKey, Forwarder, Item, ItemStatus, ItemType};
pub use transfer::{PickerIdentity, TagVerificationResult, Transfer, TransferRequest};
