//! Quantity reconciliation between batches and their parent requisition.

use std::collections::{HashMap, HashSet};

use supplygate_core::{AggregateRoot, DomainError, DomainResult, RequisitionItemId};
use supplygate_requisitions::{Requisition, RequisitionStatus, StateGraph};

use crate::{BatchLineItem, ShipmentBatch};

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchReconciler;

impl BatchReconciler {
    /// Σ shipped quantity per item over every batch, whatever its status.
    pub fn allocated(batches: &[ShipmentBatch]) -> HashMap<RequisitionItemId, u64> {
        Self::totals(batches.iter())
    }

    /// Σ shipped quantity per item over delivered batches only.
    pub fn delivered(batches: &[ShipmentBatch]) -> HashMap<RequisitionItemId, u64> {
        Self::totals(batches.iter().filter(|b| b.status().is_delivered()))
    }

    fn totals<'a>(batches: impl Iterator<Item = &'a ShipmentBatch>) -> HashMap<RequisitionItemId, u64> {
        let mut totals = HashMap::new();
        for line in batches.flat_map(|b| b.lines()) {
            *totals.entry(line.item_id).or_insert(0u64) += u64::from(line.shipped_quantity);
        }
        totals
    }

    /// Quantity of `item_id` that no batch has claimed yet.
    pub fn remaining(
        requisition: &Requisition,
        batches: &[ShipmentBatch],
        item_id: RequisitionItemId,
    ) -> u64 {
        let approved = requisition
            .active_item(item_id)
            .map(|i| u64::from(i.approved_or_requested()))
            .unwrap_or(0);
        let allocated = Self::allocated(batches).get(&item_id).copied().unwrap_or(0);
        approved.saturating_sub(allocated)
    }

    /// Validate the lines of a new batch against the requisition and the
    /// batches it already has.
    ///
    /// Every line must name an active item of this requisition, once, with a
    /// positive quantity that fits in what is left of the approved quantity.
    pub fn allocate(
        requisition: &Requisition,
        existing: &[ShipmentBatch],
        requested: &[BatchLineItem],
    ) -> DomainResult<Vec<BatchLineItem>> {
        if requested.is_empty() {
            return Err(DomainError::validation("a batch must carry at least one line"));
        }

        let allocated = Self::allocated(existing);
        let mut seen = HashSet::new();

        for line in requested {
            if !seen.insert(line.item_id) {
                return Err(DomainError::validation(format!(
                    "item {} appears more than once in the batch",
                    line.item_id
                )));
            }
            if line.shipped_quantity == 0 {
                return Err(DomainError::validation(format!(
                    "shipped quantity for item {} must be positive",
                    line.item_id
                )));
            }

            let item = requisition
                .items()
                .iter()
                .find(|i| i.id == line.item_id)
                .ok_or_else(|| {
                    DomainError::validation(format!(
                        "item {} does not belong to requisition {}",
                        line.item_id,
                        requisition.id_typed()
                    ))
                })?;
            if item.removed {
                return Err(DomainError::validation(format!("item {} has been removed", item.id)));
            }

            let approved = u64::from(item.approved_or_requested());
            let already = allocated.get(&item.id).copied().unwrap_or(0);
            let wanted = already + u64::from(line.shipped_quantity);
            if wanted > approved {
                return Err(DomainError::validation(format!(
                    "item {} would ship {wanted} of {approved} approved ({already} already in batches)",
                    item.id
                )));
            }
        }

        Ok(requested.to_vec())
    }

    /// Delivery status implied by the batches, if any batch has been delivered.
    ///
    /// Fully delivered once every active item's delivered quantity reaches its
    /// approved quantity; partially delivered otherwise.
    pub fn delivery_status(
        requisition: &Requisition,
        batches: &[ShipmentBatch],
    ) -> Option<RequisitionStatus> {
        if !batches.iter().any(|b| b.status().is_delivered()) {
            return None;
        }

        let delivered = Self::delivered(batches);
        let complete = requisition.active_items().all(|item| {
            delivered.get(&item.id).copied().unwrap_or(0) == u64::from(item.approved_or_requested())
        });

        Some(if complete {
            RequisitionStatus::FullyDelivered
        } else {
            RequisitionStatus::PartiallyDelivered
        })
    }

    /// The status the requisition should move to, or `None` when it is
    /// already there (or not in a delivery-leg status at all).
    pub fn reconcile(
        requisition: &Requisition,
        batches: &[ShipmentBatch],
    ) -> Option<RequisitionStatus> {
        let current = requisition.status();
        let target = Self::delivery_status(requisition, batches)?;
        if target == current {
            return None;
        }
        StateGraph::outgoing(current)
            .iter()
            .any(|t| t.to == target)
            .then_some(target)
    }
}
