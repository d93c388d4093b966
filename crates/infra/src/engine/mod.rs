//! Workflow orchestration.
//!
//! `WorkflowEngine` runs one action as a single unit of work:
//!
//! ```text
//! load → permission check → guard check → apply → Changeset (status + audit + outbox)
//!      → commit (compare-and-swap) → send notifications
//! ```
//!
//! Nothing is written unless every check passes, and nothing is sent unless
//! the commit succeeded. Sending is fire-and-forget: a failing sink is logged
//! and the committed action still succeeds.

mod batch;
mod notify;
mod requisition;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use supplygate_core::{BatchId, DomainError, RequisitionId};
use supplygate_notifications::NotificationSink;
use supplygate_requisitions::Requisition;
use supplygate_shipments::ShipmentBatch;

use crate::error::{WorkflowError, WorkflowResult};
use crate::store::{Changeset, StoreError, WorkflowStore};

pub use batch::NewBatch;

/// Role-gated workflow over requisitions and their shipment batches.
///
/// Holds no mutable state of its own; mutual exclusion is the store's job.
#[derive(Debug)]
pub struct WorkflowEngine<S, N> {
    store: S,
    sink: N,
}

impl<S, N> WorkflowEngine<S, N> {
    pub fn new(store: S, sink: N) -> Self {
        Self { store, sink }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn into_parts(self) -> (S, N) {
        (self.store, self.sink)
    }
}

impl<S, N> WorkflowEngine<S, N>
where
    S: WorkflowStore,
    N: NotificationSink,
{
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn load_requisition(&self, id: RequisitionId) -> WorkflowResult<Requisition> {
        self.store
            .load_requisition(id)?
            .ok_or_else(|| DomainError::not_found(format!("requisition {id}")).into())
    }

    fn load_batch(&self, id: BatchId) -> WorkflowResult<ShipmentBatch> {
        self.store
            .load_batch(id)?
            .ok_or_else(|| DomainError::not_found(format!("shipment batch {id}")).into())
    }

    /// Commit the changeset, then hand its outbox to the sink.
    fn commit_and_notify(&self, changeset: Changeset) -> WorkflowResult<()> {
        let outbox = changeset.outbox.clone();
        let audit_entries = changeset.audit.len();

        if let Err(e) = self.store.commit(changeset) {
            match &e {
                StoreError::Conflict(reason) => warn!(%reason, "commit rejected by status precondition"),
                StoreError::NotFound(reason) => warn!(%reason, "commit target disappeared"),
                StoreError::Integrity(_) | StoreError::Unavailable(_) => {
                    error!(error = %e, "workflow store failed to commit")
                }
            }
            return Err(e.into());
        }
        info!(audit_entries, notifications = outbox.len(), "workflow changes committed");

        for envelope in outbox {
            let kind = envelope.request().kind;
            if let Err(e) = self.sink.send(envelope.into_request()) {
                warn!(%kind, error = ?e, "notification could not be delivered; kept in outbox");
            }
        }
        Ok(())
    }
}

/// Reject a free-text field that is blank once trimmed.
fn non_blank(text: &str, what: &str) -> Result<String, WorkflowError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{what} must not be empty")).into());
    }
    Ok(trimmed.to_string())
}
