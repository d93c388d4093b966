use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use supplygate_core::{
    AggregateRoot, BatchId, DomainError, DomainResult, RequisitionId, RequisitionItemId, UserId,
};

use crate::{BatchAction, BatchStatus, MIN_PICKUP_NOTE_CHARS};

/// Quantity of one requisition item carried by one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLineItem {
    pub item_id: RequisitionItemId,
    pub shipped_quantity: u32,
}

/// Optional batch metadata supplied at creation or by a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetails {
    pub carrier: Option<String>,
    pub destination: Option<String>,
    pub notes: Option<String>,
}

/// Patch for a batch that has not been dispatched yet.
///
/// `None` leaves a field untouched; `Some("")` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPatch {
    pub carrier: Option<String>,
    pub destination: Option<String>,
    pub notes: Option<String>,
    pub status: Option<BatchStatus>,
}

impl BatchPatch {
    pub fn is_empty(&self) -> bool {
        self.carrier.is_none() && self.destination.is_none() && self.notes.is_none() && self.status.is_none()
    }
}

/// Aggregate root: ShipmentBatch.
///
/// # Invariants
/// - `batch_number` is the 1-based position of the batch within its requisition.
/// - Metadata can only change while the batch is editable (pending/preparing).
/// - Pickup date and note are only ever set by scheduling a pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentBatch {
    id: BatchId,
    requisition_id: RequisitionId,
    batch_number: u32,
    status: BatchStatus,
    carrier: Option<String>,
    destination: Option<String>,
    notes: Option<String>,
    estimated_pickup_date: Option<NaiveDate>,
    pickup_note: Option<String>,
    lines: Vec<BatchLineItem>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn normalize(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ShipmentBatch {
    /// Open a new batch in `pending`. Lines must already be validated against
    /// the parent requisition (see [`crate::BatchReconciler::allocate`]).
    pub fn open(
        id: BatchId,
        requisition_id: RequisitionId,
        batch_number: u32,
        lines: Vec<BatchLineItem>,
        details: BatchDetails,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if batch_number == 0 {
            return Err(DomainError::validation("batch numbers start at 1"));
        }
        if lines.is_empty() {
            return Err(DomainError::validation("a batch must carry at least one line"));
        }

        Ok(Self {
            id,
            requisition_id,
            batch_number,
            status: BatchStatus::Pending,
            carrier: normalize(details.carrier),
            destination: normalize(details.destination),
            notes: normalize(details.notes),
            estimated_pickup_date: None,
            pickup_note: None,
            lines,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> BatchId {
        self.id
    }

    pub fn requisition_id(&self) -> RequisitionId {
        self.requisition_id
    }

    pub fn batch_number(&self) -> u32 {
        self.batch_number
    }

    pub fn carrier(&self) -> Option<&str> {
        self.carrier.as_deref()
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn estimated_pickup_date(&self) -> Option<NaiveDate> {
        self.estimated_pickup_date
    }

    pub fn pickup_note(&self) -> Option<&str> {
        self.pickup_note.as_deref()
    }

    pub fn lines(&self) -> &[BatchLineItem] {
        &self.lines
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Quantity of `item_id` carried by this batch.
    pub fn quantity_of(&self, item_id: RequisitionItemId) -> u32 {
        self.lines
            .iter()
            .filter(|l| l.item_id == item_id)
            .map(|l| l.shipped_quantity)
            .sum()
    }

    /// Apply carrier/destination/notes from a patch. Status is handled by the
    /// caller through the batch graph.
    pub fn apply_details(&mut self, patch: &BatchPatch, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_editable()?;

        if let Some(carrier) = &patch.carrier {
            self.carrier = normalize(Some(carrier.clone()));
        }
        if let Some(destination) = &patch.destination {
            self.destination = normalize(Some(destination.clone()));
        }
        if let Some(notes) = &patch.notes {
            self.notes = normalize(Some(notes.clone()));
        }
        self.updated_at = now;
        Ok(())
    }

    /// Record a scheduled pickup and move to `pending-receipt`.
    pub fn schedule_pickup(
        &mut self,
        estimated_date: NaiveDate,
        note: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let note = note.trim();
        if note.chars().count() < MIN_PICKUP_NOTE_CHARS {
            return Err(DomainError::validation(format!(
                "pickup note must be at least {MIN_PICKUP_NOTE_CHARS} characters"
            )));
        }
        if !matches!(self.status, BatchStatus::Dispatched | BatchStatus::InTransit) {
            return Err(DomainError::invalid_transition(format!(
                "cannot {} a batch in status '{}'",
                BatchAction::SchedulePickup,
                self.status
            )));
        }

        self.estimated_pickup_date = Some(estimated_date);
        self.pickup_note = Some(note.to_string());
        self.status = BatchStatus::PendingReceipt;
        self.updated_at = now;
        Ok(())
    }

    /// Move to `next`. Edge and role checks belong to the batch graph.
    pub fn transition_to(&mut self, next: BatchStatus, now: DateTime<Utc>) {
        self.status = next;
        self.updated_at = now;
    }

    pub fn ensure_editable(&self) -> DomainResult<()> {
        if !self.status.is_editable() {
            return Err(DomainError::conflict(format!(
                "batch #{} is '{}' and can no longer be modified",
                self.batch_number, self.status
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for ShipmentBatch {
    type Id = BatchId;
    type Status = BatchStatus;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn status(&self) -> Self::Status {
        self.status
    }
}
