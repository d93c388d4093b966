use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supplygate_core::{
    AggregateRoot, DomainError, DomainResult, RequisitionId, RequisitionItemId, UserId,
};

use crate::{RequisitionStatus, StateGraph};

/// One requested line within a requisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionItem {
    pub id: RequisitionItemId,
    pub description: String,
    pub requested_quantity: u32,
    pub approved_quantity: Option<u32>,
    pub removed: bool,
}

impl RequisitionItem {
    /// Quantity that batches may ship against.
    ///
    /// Until a reviewer sets an explicit approved quantity, the full requested
    /// quantity is considered approved.
    pub fn approved_or_requested(&self) -> u32 {
        self.approved_quantity.unwrap_or(self.requested_quantity)
    }

    pub fn is_active(&self) -> bool {
        !self.removed
    }
}

/// Aggregate root: Requisition.
///
/// # Invariants
/// - `status` only changes through [`Requisition::transition_to`], which refuses to
///   leave a terminal status.
/// - An item's approved quantity never exceeds its requested quantity.
/// - Removed items are retained but ignored by every workflow calculation.
/// - `revision` counts committed writes to the requisition or its batches; it
///   is owned by the store and never changed by workflow code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requisition {
    id: RequisitionId,
    requester_id: UserId,
    status: RequisitionStatus,
    items: Vec<RequisitionItem>,
    #[serde(default)]
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Requisition {
    /// A fresh draft owned by `requester_id`.
    pub fn draft(id: RequisitionId, requester_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            requester_id,
            status: RequisitionStatus::Draft,
            items: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_typed(&self) -> RequisitionId {
        self.id
    }

    pub fn requester_id(&self) -> UserId {
        self.requester_id
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.requester_id == user_id
    }

    pub fn items(&self) -> &[RequisitionItem] {
        &self.items
    }

    pub fn active_items(&self) -> impl Iterator<Item = &RequisitionItem> {
        self.items.iter().filter(|i| i.is_active())
    }

    pub fn active_item_count(&self) -> usize {
        self.active_items().count()
    }

    /// Look up an item that still takes part in the workflow.
    pub fn active_item(&self, item_id: RequisitionItemId) -> Option<&RequisitionItem> {
        self.active_items().find(|i| i.id == item_id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Store revision this copy was read at.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Advance the revision after a committed write. Stores call this; workflow
    /// code compares revisions but never sets them.
    pub fn bump_revision(&mut self) {
        self.revision += 1;
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Add a requested line while the requisition is still a draft.
    pub fn add_item(
        &mut self,
        description: impl Into<String>,
        requested_quantity: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<RequisitionItemId> {
        self.ensure_draft("add items")?;

        let description = description.into();
        if description.trim().is_empty() {
            return Err(DomainError::validation("item description must not be empty"));
        }
        if requested_quantity == 0 {
            return Err(DomainError::validation("requested quantity must be positive"));
        }

        let id = RequisitionItemId::new();
        self.items.push(RequisitionItem {
            id,
            description,
            requested_quantity,
            approved_quantity: None,
            removed: false,
        });
        self.updated_at = now;
        Ok(id)
    }

    /// Soft-delete a line while the requisition is still a draft.
    pub fn remove_item(&mut self, item_id: RequisitionItemId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_draft("remove items")?;

        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id && !i.removed)
            .ok_or_else(|| DomainError::not_found(format!("item {item_id}")))?;
        item.removed = true;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_approved_quantity(
        &mut self,
        item_id: RequisitionItemId,
        approved: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| DomainError::validation(format!("item {item_id} does not belong to this requisition")))?;

        if item.removed {
            return Err(DomainError::validation(format!("item {item_id} has been removed")));
        }
        if approved > item.requested_quantity {
            return Err(DomainError::validation(format!(
                "approved quantity {approved} exceeds requested quantity {} for item {item_id}",
                item.requested_quantity
            )));
        }

        item.approved_quantity = Some(approved);
        self.updated_at = now;
        Ok(())
    }

    /// Move to `next`. Graph and role checks are the caller's job; this only
    /// guards the aggregate against leaving a terminal status.
    pub fn transition_to(&mut self, next: RequisitionStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if StateGraph::is_terminal(self.status) {
            return Err(DomainError::invalid_transition(format!(
                "requisition is in terminal status '{}'",
                self.status
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    fn ensure_draft(&self, what: &str) -> DomainResult<()> {
        if self.status != RequisitionStatus::Draft {
            return Err(DomainError::invalid_transition(format!(
                "cannot {what} once the requisition has been submitted"
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for Requisition {
    type Id = RequisitionId;
    type Status = RequisitionStatus;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn status(&self) -> Self::Status {
        self.status
    }
}
