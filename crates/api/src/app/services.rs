use std::sync::Arc;

use chrono::Utc;

use supplygate_core::{RequisitionId, UserId};
use supplygate_infra::{InMemoryWorkflowStore, WorkflowEngine, WorkflowResult};
use supplygate_notifications::{InMemoryNotificationSink, NotificationSink};
use supplygate_requisitions::Requisition;

pub type InMemoryEngine = WorkflowEngine<Arc<InMemoryWorkflowStore>, Arc<InMemoryNotificationSink>>;

/// Everything the handlers need, shared behind one `Arc`.
#[derive(Debug, Clone)]
pub struct AppServices {
    engine: Arc<InMemoryEngine>,
    store: Arc<InMemoryWorkflowStore>,
    sink: Arc<InMemoryNotificationSink>,
}

impl AppServices {
    /// In-memory wiring (dev/test): store + sink + engine.
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let sink = Arc::new(InMemoryNotificationSink::new());
        let engine = Arc::new(WorkflowEngine::new(store.clone(), sink.clone()));
        Self { engine, store, sink }
    }

    pub fn engine(&self) -> &InMemoryEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<InMemoryWorkflowStore> {
        &self.store
    }

    pub fn sink(&self) -> &Arc<InMemoryNotificationSink> {
        &self.sink
    }

    /// Seed a draft with two items owned by `owner` (dev only; requisition
    /// creation is not part of the workflow API).
    pub fn seed_demo(&self, owner: UserId) -> WorkflowResult<RequisitionId> {
        let now = Utc::now();
        let mut requisition = Requisition::draft(RequisitionId::new(), owner, now);
        requisition.add_item("Safety helmet", 10, now)?;
        requisition.add_item("High-visibility vest", 4, now)?;
        let id = requisition.id_typed();
        self.store.insert_requisition(requisition)?;
        Ok(id)
    }

    /// Background subscriber: sink → log, standing in for a delivery channel.
    pub fn spawn_notification_log(&self) -> tokio::task::JoinHandle<()> {
        let subscription = self.sink.subscribe();
        tokio::task::spawn_blocking(move || {
            while let Ok(request) = subscription.recv() {
                tracing::info!(
                    kind = %request.kind,
                    requisition_id = %request.requisition_id,
                    recipients = request.recipients.len(),
                    title = %request.title,
                    "notification ready for delivery"
                );
            }
        })
    }
}
