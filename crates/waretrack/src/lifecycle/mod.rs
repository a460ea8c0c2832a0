//! Item workflow rules: checklist evaluation, the status state machine and
//! the append-only operation history.

pub mod checklist;
pub mod engine;
pub mod history;

pub use checklist::{evaluate, is_complete, required_keys, ChecklistEvaluation};
pub use engine::{
    admin_set_status, apply_checklist_update, assign_forwarder, attach_photo, complete_transfer,
    confirm_available_for_pickup, create_item, ensure_admin, ensure_can_modify, update_fields,
    NewItem, StatusChange, AUTO_PROCESSED_REASON,
};
pub use history::{replay_statuses, ReplayError};
