//! Pure evaluation of an item's checklist requirements.
//!
//! The required set is state-dependent: `photographed` is only required for
//! EVA/EVERGREEN items, and `forwarderBooked` only joins the set once the SAP
//! operation is done *and* a forwarder is assigned. Completeness additionally
//! demands a forwarder on top of the checklist itself.

use serde::Serialize;

use crate::model::{ChecklistKey, Item};

/// Steps every item has to complete.
pub const BASE_REQUIRED: [ChecklistKey; 5] = [
    ChecklistKey::ItemPicked,
    ChecklistKey::IdentityVerified,
    ChecklistKey::SapOperationDone,
    ChecklistKey::Packaged,
    ChecklistKey::PlacedInDesignatedArea,
];

/// Summary of where an item stands against its checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistEvaluation {
    pub required: Vec<ChecklistKey>,
    pub missing: Vec<ChecklistKey>,
    pub forwarder_assigned: bool,
    pub complete: bool,
}

/// The checklist keys currently required for `item`.
pub fn required_keys(item: &Item) -> Vec<ChecklistKey> {
    let mut required = BASE_REQUIRED.to_vec();

    if item.item_type.requires_photograph() {
        required.push(ChecklistKey::Photographed);
    }

    if item.checklist.sap_operation_done && item.has_forwarder() {
        required.push(ChecklistKey::ForwarderBooked);
    }

    required
}

/// Required keys that are not ticked yet.
pub fn missing_keys(item: &Item) -> Vec<ChecklistKey> {
    required_keys(item)
        .into_iter()
        .filter(|key| !item.checklist.get(*key))
        .collect()
}

/// True when every required key is ticked and a forwarder is assigned.
pub fn is_complete(item: &Item) -> bool {
    missing_keys(item).is_empty() && item.has_forwarder()
}

pub fn evaluate(item: &Item) -> ChecklistEvaluation {
    let required = required_keys(item);
    let missing: Vec<ChecklistKey> = required
        .iter()
        .copied()
        .filter(|key| !item.checklist.get(*key))
        .collect();
    let forwarder_assigned = item.has_forwarder();
    let complete = missing.is_empty() && forwarder_assigned;

    ChecklistEvaluation {
        required,
        missing,
        forwarder_assigned,
        complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::fixtures::sample_item;
    use crate::model::{Forwarder, ItemType};

    fn tick_base(item: &mut Item) {
        for key in BASE_REQUIRED {
            item.checklist.set(key, true);
        }
    }

    #[test]
    fn test_base_set_for_other_items() {
        let item = sample_item(ItemType::Other);
        assert_eq!(required_keys(&item), BASE_REQUIRED.to_vec());
    }

    #[test]
    fn test_photographed_required_for_eva_and_evergreen() {
        for item_type in [ItemType::Eva, ItemType::Evergreen] {
            let item = sample_item(item_type);
            assert!(required_keys(&item).contains(&ChecklistKey::Photographed));
        }
    }

    #[test]
    fn test_photographed_value_irrelevant_for_other_items() {
        let mut item = sample_item(ItemType::Other);
        tick_base(&mut item);
        item.forwarder = Some(Forwarder::Dhl);
        item.checklist.forwarder_booked = true;

        item.checklist.photographed = false;
        let without = is_complete(&item);
        item.checklist.photographed = true;
        let with = is_complete(&item);

        assert!(without);
        assert_eq!(without, with);
    }

    #[test]
    fn test_forwarder_booked_requires_sap_and_forwarder() {
        let mut item = sample_item(ItemType::Other);
        assert!(!required_keys(&item).contains(&ChecklistKey::ForwarderBooked));

        item.checklist.sap_operation_done = true;
        assert!(!required_keys(&item).contains(&ChecklistKey::ForwarderBooked));

        item.forwarder = Some(Forwarder::Fedex);
        assert!(required_keys(&item).contains(&ChecklistKey::ForwarderBooked));

        item.checklist.sap_operation_done = false;
        assert!(!required_keys(&item).contains(&ChecklistKey::ForwarderBooked));
    }

    #[test]
    fn test_complete_checklist_without_forwarder_is_blocked() {
        let mut item = sample_item(ItemType::Other);
        for key in ChecklistKey::ALL {
            item.checklist.set(key, true);
        }
        assert!(missing_keys(&item).is_empty());
        assert!(!is_complete(&item));

        item.forwarder = Some(Forwarder::Ups);
        assert!(is_complete(&item));
    }

    #[test]
    fn test_forwarder_booked_blocks_once_required() {
        let mut item = sample_item(ItemType::Other);
        tick_base(&mut item);
        item.forwarder = Some(Forwarder::Dhl);

        assert_eq!(missing_keys(&item), vec![ChecklistKey::ForwarderBooked]);
        assert!(!is_complete(&item));
    }

    #[test]
    fn test_evaluate_reports_missing_and_forwarder() {
        let mut item = sample_item(ItemType::Eva);
        item.checklist.item_picked = true;

        let evaluation = evaluate(&item);
        assert!(!evaluation.complete);
        assert!(!evaluation.forwarder_assigned);
        assert!(evaluation.missing.contains(&ChecklistKey::Photographed));
        assert!(!evaluation.missing.contains(&ChecklistKey::ItemPicked));
        assert_eq!(evaluation.complete, is_complete(&item));
    }
}
