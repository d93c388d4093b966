use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use supplygate_core::{AggregateRoot, BatchId, ExpectedStatus, RequisitionId};
use supplygate_notifications::NotificationEnvelope;
use supplygate_requisitions::{Requisition, RequisitionStatus, StatusHistoryEntry};
use supplygate_shipments::{BatchStatus, ShipmentBatch};

/// Persistence operation error.
///
/// These are storage failures, as opposed to domain errors (permissions,
/// graph edges, guards).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A status/revision precondition or uniqueness constraint did not hold.
    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Stored data violates an invariant the store is supposed to maintain.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// The backend could not serve the request (lock poisoned, connection lost).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// How a changeset touches the parent requisition.
///
/// Both forms also pin the revision the requisition was read at, so a
/// concurrent write to its quantities or its batches fails the commit even
/// when the status is unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequisitionWrite {
    /// Leave the requisition as is, but only commit if its status and
    /// revision still match.
    Guard {
        id: RequisitionId,
        expected: ExpectedStatus<RequisitionStatus>,
        revision: u64,
    },
    /// Replace the stored requisition if its status still matches and the
    /// stored revision equals `requisition.revision()`.
    Update {
        expected: ExpectedStatus<RequisitionStatus>,
        requisition: Requisition,
    },
}

impl RequisitionWrite {
    pub fn requisition_id(&self) -> RequisitionId {
        match self {
            RequisitionWrite::Guard { id, .. } => *id,
            RequisitionWrite::Update { requisition, .. } => requisition.id_typed(),
        }
    }

    pub fn expected(&self) -> ExpectedStatus<RequisitionStatus> {
        match self {
            RequisitionWrite::Guard { expected, .. } | RequisitionWrite::Update { expected, .. } => {
                *expected
            }
        }
    }

    pub fn expected_revision(&self) -> u64 {
        match self {
            RequisitionWrite::Guard { revision, .. } => *revision,
            RequisitionWrite::Update { requisition, .. } => requisition.revision(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchWrite {
    /// A new batch; its number must be unused within the requisition.
    Insert(ShipmentBatch),
    /// Replace a stored batch if its status still matches.
    Update {
        expected: ExpectedStatus<BatchStatus>,
        batch: ShipmentBatch,
    },
}

impl BatchWrite {
    pub fn batch(&self) -> &ShipmentBatch {
        match self {
            BatchWrite::Insert(batch) | BatchWrite::Update { batch, .. } => batch,
        }
    }
}

/// One atomic unit of work: aggregate writes, audit entries and the
/// notification outbox rows they produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub requisition: Option<RequisitionWrite>,
    pub batches: Vec<BatchWrite>,
    pub audit: Vec<StatusHistoryEntry>,
    pub outbox: Vec<NotificationEnvelope>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(mut self, requisition: &Requisition) -> Self {
        self.requisition = Some(RequisitionWrite::Guard {
            id: requisition.id_typed(),
            expected: ExpectedStatus::of(requisition),
            revision: requisition.revision(),
        });
        self
    }

    pub fn update(mut self, expected: ExpectedStatus<RequisitionStatus>, requisition: Requisition) -> Self {
        self.requisition = Some(RequisitionWrite::Update {
            expected,
            requisition,
        });
        self
    }

    pub fn insert_batch(mut self, batch: ShipmentBatch) -> Self {
        self.batches.push(BatchWrite::Insert(batch));
        self
    }

    pub fn update_batch(mut self, expected: ExpectedStatus<BatchStatus>, batch: ShipmentBatch) -> Self {
        self.batches.push(BatchWrite::Update { expected, batch });
        self
    }

    pub fn audit(mut self, entry: StatusHistoryEntry) -> Self {
        self.audit.push(entry);
        self
    }

    pub fn notify(mut self, envelope: NotificationEnvelope) -> Self {
        self.outbox.push(envelope);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.requisition.is_none()
            && self.batches.is_empty()
            && self.audit.is_empty()
            && self.outbox.is_empty()
    }
}

/// Storage for requisitions, their batches and their audit trail.
///
/// Implementations must:
/// - apply a [`Changeset`] all or nothing
/// - compare-and-swap every status carried by an [`ExpectedStatus`]
/// - compare-and-swap the requisition revision of a [`RequisitionWrite`], and
///   bump it whenever the requisition or one of its batches is written
/// - keep batch numbers unique per requisition
/// - never edit or delete audit entries
pub trait WorkflowStore: Send + Sync {
    fn load_requisition(&self, id: RequisitionId) -> Result<Option<Requisition>, StoreError>;

    fn load_batch(&self, id: BatchId) -> Result<Option<ShipmentBatch>, StoreError>;

    /// Batches of a requisition ordered by batch number.
    fn list_batches(&self, requisition_id: RequisitionId) -> Result<Vec<ShipmentBatch>, StoreError>;

    /// Audit entries of a requisition in append order.
    fn history(&self, requisition_id: RequisitionId) -> Result<Vec<StatusHistoryEntry>, StoreError>;

    fn commit(&self, changeset: Changeset) -> Result<(), StoreError>;

    fn count_batches(&self, requisition_id: RequisitionId) -> Result<u32, StoreError> {
        let batches = self.list_batches(requisition_id)?;
        u32::try_from(batches.len())
            .map_err(|_| StoreError::Integrity(format!("requisition {requisition_id} has too many batches")))
    }

    /// Conditional status write on its own.
    fn save_requisition_status(
        &self,
        id: RequisitionId,
        expected: ExpectedStatus<RequisitionStatus>,
        next: RequisitionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut requisition = self
            .load_requisition(id)?
            .ok_or_else(|| StoreError::NotFound(format!("requisition {id}")))?;
        if !expected.matches(requisition.status()) {
            return Err(StoreError::Conflict(format!(
                "requisition {id} is '{}', expected '{}'",
                requisition.status(),
                expected.status()
            )));
        }
        requisition
            .transition_to(next, now)
            .map_err(|e| StoreError::Integrity(e.to_string()))?;
        self.commit(Changeset::new().update(expected, requisition))
    }

    /// Conditional batch write on its own.
    fn save_batch(&self, expected: ExpectedStatus<BatchStatus>, batch: ShipmentBatch) -> Result<(), StoreError> {
        self.commit(Changeset::new().update_batch(expected, batch))
    }

    fn append_audit_entry(&self, entry: StatusHistoryEntry) -> Result<(), StoreError> {
        self.commit(Changeset::new().audit(entry))
    }
}

impl<S> WorkflowStore for Arc<S>
where
    S: WorkflowStore + ?Sized,
{
    fn load_requisition(&self, id: RequisitionId) -> Result<Option<Requisition>, StoreError> {
        (**self).load_requisition(id)
    }

    fn load_batch(&self, id: BatchId) -> Result<Option<ShipmentBatch>, StoreError> {
        (**self).load_batch(id)
    }

    fn list_batches(&self, requisition_id: RequisitionId) -> Result<Vec<ShipmentBatch>, StoreError> {
        (**self).list_batches(requisition_id)
    }

    fn history(&self, requisition_id: RequisitionId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        (**self).history(requisition_id)
    }

    fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        (**self).commit(changeset)
    }

    fn count_batches(&self, requisition_id: RequisitionId) -> Result<u32, StoreError> {
        (**self).count_batches(requisition_id)
    }
}
