use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use supplygate_core::{AggregateRoot, BatchId, RequisitionId};
use supplygate_notifications::NotificationEnvelope;
use supplygate_requisitions::{Requisition, StatusHistoryEntry};
use supplygate_shipments::ShipmentBatch;

use super::r#trait::{BatchWrite, Changeset, RequisitionWrite, StoreError, WorkflowStore};

#[derive(Debug, Default)]
struct State {
    requisitions: HashMap<RequisitionId, Requisition>,
    batches: HashMap<BatchId, ShipmentBatch>,
    history: HashMap<RequisitionId, Vec<StatusHistoryEntry>>,
    outbox: Vec<NotificationEnvelope>,
}

impl State {
    fn batch_numbers(&self, requisition_id: RequisitionId) -> HashSet<u32> {
        self.batches
            .values()
            .filter(|b| b.requisition_id() == requisition_id)
            .map(|b| b.batch_number())
            .collect()
    }

    /// Check every precondition of `changeset` without touching any state.
    fn validate(&self, changeset: &Changeset) -> Result<(), StoreError> {
        if let Some(write) = &changeset.requisition {
            let id = write.requisition_id();
            let stored = self
                .requisitions
                .get(&id)
                .ok_or_else(|| StoreError::NotFound(format!("requisition {id}")))?;
            let expected = write.expected();
            if !expected.matches(stored.status()) {
                return Err(StoreError::Conflict(format!(
                    "requisition {id} is '{}', expected '{}'",
                    stored.status(),
                    expected.status()
                )));
            }
            if write.expected_revision() != stored.revision() {
                return Err(StoreError::Conflict(format!(
                    "requisition {id} is at revision {}, read at {}",
                    stored.revision(),
                    write.expected_revision()
                )));
            }
        }

        let mut inserted_numbers: HashMap<RequisitionId, HashSet<u32>> = HashMap::new();
        for write in &changeset.batches {
            let batch = write.batch();
            let id = batch.id_typed();
            match write {
                BatchWrite::Insert(_) => {
                    if self.batches.contains_key(&id) {
                        return Err(StoreError::Conflict(format!("batch {id} already exists")));
                    }
                    let requisition_id = batch.requisition_id();
                    if !self.requisitions.contains_key(&requisition_id) {
                        return Err(StoreError::NotFound(format!("requisition {requisition_id}")));
                    }
                    let pending = inserted_numbers.entry(requisition_id).or_default();
                    if self.batch_numbers(requisition_id).contains(&batch.batch_number())
                        || !pending.insert(batch.batch_number())
                    {
                        return Err(StoreError::Conflict(format!(
                            "batch #{} already exists for requisition {requisition_id}",
                            batch.batch_number()
                        )));
                    }
                }
                BatchWrite::Update { expected, .. } => {
                    let stored = self
                        .batches
                        .get(&id)
                        .ok_or_else(|| StoreError::NotFound(format!("batch {id}")))?;
                    if !expected.matches(stored.status()) {
                        return Err(StoreError::Conflict(format!(
                            "batch {id} is '{}', expected '{}'",
                            stored.status(),
                            expected.status()
                        )));
                    }
                    if stored.requisition_id() != batch.requisition_id()
                        || stored.batch_number() != batch.batch_number()
                    {
                        return Err(StoreError::Integrity(format!(
                            "batch {id} cannot change requisition or number"
                        )));
                    }
                }
            }
        }

        for entry in &changeset.audit {
            if !self.requisitions.contains_key(&entry.requisition_id) {
                return Err(StoreError::NotFound(format!("requisition {}", entry.requisition_id)));
            }
        }

        Ok(())
    }

    fn apply(&mut self, changeset: Changeset) {
        let mut touched = HashSet::new();
        if let Some(RequisitionWrite::Update { requisition, .. }) = changeset.requisition {
            touched.insert(requisition.id_typed());
            self.requisitions.insert(requisition.id_typed(), requisition);
        }
        for write in changeset.batches {
            let batch = match write {
                BatchWrite::Insert(batch) | BatchWrite::Update { batch, .. } => batch,
            };
            touched.insert(batch.requisition_id());
            self.batches.insert(batch.id_typed(), batch);
        }
        for id in touched {
            if let Some(requisition) = self.requisitions.get_mut(&id) {
                requisition.bump_revision();
            }
        }
        for entry in changeset.audit {
            self.history.entry(entry.requisition_id).or_default().push(entry);
        }
        self.outbox.extend(changeset.outbox);
    }
}

/// In-memory workflow store.
///
/// Intended for tests/dev. One lock guards all maps, so a changeset is
/// validated and applied under the same write guard.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    state: RwLock<State>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    /// Seed a requisition. Creation is not a workflow action, so this bypasses
    /// the changeset path and writes no audit entry.
    pub fn insert_requisition(&self, requisition: Requisition) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let id = requisition.id_typed();
        if state.requisitions.contains_key(&id) {
            return Err(StoreError::Conflict(format!("requisition {id} already exists")));
        }
        state.requisitions.insert(id, requisition);
        Ok(())
    }

    /// Every committed notification row, oldest first.
    pub fn outbox(&self) -> Result<Vec<NotificationEnvelope>, StoreError> {
        Ok(self.read()?.outbox.clone())
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn load_requisition(&self, id: RequisitionId) -> Result<Option<Requisition>, StoreError> {
        Ok(self.read()?.requisitions.get(&id).cloned())
    }

    fn load_batch(&self, id: BatchId) -> Result<Option<ShipmentBatch>, StoreError> {
        Ok(self.read()?.batches.get(&id).cloned())
    }

    fn list_batches(&self, requisition_id: RequisitionId) -> Result<Vec<ShipmentBatch>, StoreError> {
        let state = self.read()?;
        let mut batches: Vec<ShipmentBatch> = state
            .batches
            .values()
            .filter(|b| b.requisition_id() == requisition_id)
            .cloned()
            .collect();
        batches.sort_by_key(|b| b.batch_number());
        Ok(batches)
    }

    fn history(&self, requisition_id: RequisitionId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        Ok(self
            .read()?
            .history
            .get(&requisition_id)
            .cloned()
            .unwrap_or_default())
    }

    fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        if changeset.is_empty() {
            return Ok(());
        }
        let mut state = self.write()?;
        state.validate(&changeset)?;
        state.apply(changeset);
        Ok(())
    }
}
