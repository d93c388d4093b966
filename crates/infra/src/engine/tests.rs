use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;

use supplygate_auth::{Actor, Role};
use supplygate_core::{AggregateRoot, BatchId, ErrorKind, RequisitionId, RequisitionItemId, UserId};
use supplygate_notifications::{
    InMemoryNotificationSink, NotificationKind, NotificationRequest, NotificationSink, Subscription,
};
use supplygate_requisitions::{Requisition, RequisitionStatus as S, StatusHistoryEntry};
use supplygate_shipments::{
    BatchAction, BatchCapabilities, BatchLineItem, BatchPatch, BatchReconciler, BatchStatus, ShipmentBatch,
};

use super::{NewBatch, WorkflowEngine};
use crate::error::WorkflowError;
use crate::store::{Changeset, InMemoryWorkflowStore, StoreError, WorkflowStore};

type Engine = WorkflowEngine<Arc<InMemoryWorkflowStore>, Arc<InMemoryNotificationSink>>;

fn engine() -> Engine {
    WorkflowEngine::new(
        Arc::new(InMemoryWorkflowStore::new()),
        Arc::new(InMemoryNotificationSink::new()),
    )
}

fn actor(role: Role) -> Actor {
    Actor::new(UserId::new(), role)
}

/// Seed a requisition owned by `owner` with the given item quantities,
/// already sitting in `status`.
fn seed<N>(
    engine: &WorkflowEngine<Arc<InMemoryWorkflowStore>, N>,
    owner: &Actor,
    quantities: &[u32],
    status: S,
) -> (RequisitionId, Vec<RequisitionItemId>) {
    seed_store(engine.store(), owner, quantities, status)
}

fn seed_store(
    store: &InMemoryWorkflowStore,
    owner: &Actor,
    quantities: &[u32],
    status: S,
) -> (RequisitionId, Vec<RequisitionItemId>) {
    let mut req = Requisition::draft(RequisitionId::new(), owner.user_id(), Utc::now());
    let items = quantities
        .iter()
        .map(|q| req.add_item("safety helmet", *q, Utc::now()).unwrap())
        .collect();
    if status != S::Draft {
        req.transition_to(status, Utc::now()).unwrap();
    }
    let id = req.id_typed();
    store.insert_requisition(req).unwrap();
    (id, items)
}

fn status_of(engine: &Engine, id: RequisitionId) -> S {
    engine.store().load_requisition(id).unwrap().unwrap().status()
}

fn history(engine: &Engine, id: RequisitionId) -> Vec<StatusHistoryEntry> {
    engine.store().history(id).unwrap()
}

fn line(item_id: RequisitionItemId, shipped_quantity: u32) -> NewBatch {
    NewBatch {
        lines: vec![BatchLineItem {
            item_id,
            shipped_quantity,
        }],
        ..NewBatch::default()
    }
}

fn dispatch() -> BatchPatch {
    BatchPatch {
        status: Some(BatchStatus::Dispatched),
        ..BatchPatch::default()
    }
}

#[test]
fn submit_then_security_approval() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let (id, _) = seed(&engine, &owner, &[1], S::Draft);

    let req = engine.submit(id, &owner).unwrap();
    assert_eq!(req.status(), S::SecurityReview);

    let err = engine.approve(id, &actor(Role::Management), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let req = engine.approve(id, &actor(Role::Security), Some("badge checked".into())).unwrap();
    assert_eq!(req.status(), S::ManagementReview);

    let entries = history(&engine, id);
    assert_eq!(entries.len(), 2);
    assert_eq!((entries[0].previous_status, entries[0].new_status), (S::Draft, S::SecurityReview));
    assert_eq!((entries[1].previous_status, entries[1].new_status), (S::SecurityReview, S::ManagementReview));
    assert_eq!(entries[1].comment.as_deref(), Some("badge checked"));

    let sent = engine.sink().sent();
    assert!(sent[0].is_addressed_to_role(Role::Security));
    assert!(sent[1].is_addressed_to_role(Role::Management));
}

#[test]
fn security_rejection_notifies_owner_once() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let (id, _) = seed(&engine, &owner, &[1], S::SecurityReview);
    let inbox = engine.sink().subscribe();

    let req = engine.reject(id, &actor(Role::Security), "Falta casco").unwrap();
    assert_eq!(req.status(), S::RejectedBySecurity);

    let to_owner: Vec<NotificationRequest> = inbox
        .drain()
        .into_iter()
        .filter(|n| n.is_addressed_to_user(owner.user_id()))
        .collect();
    assert_eq!(to_owner.len(), 1);
    assert_eq!(to_owner[0].kind, NotificationKind::RequisitionRejected);
    assert_eq!(to_owner[0].message, "Falta casco");

    let err = engine.approve(id, &actor(Role::Admin), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(history(&engine, id).len(), 1);
}

#[test]
fn batches_reconcile_to_fully_delivered() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let logistics = actor(Role::Logistics);
    let receiver = actor(Role::Receiver);
    let (id, items) = seed(&engine, &owner, &[10], S::ReadyToDispatch);

    let first = engine.create_batch(id, &logistics, line(items[0], 6)).unwrap();
    assert_eq!(first.batch_number(), 1);

    let err = engine.create_batch(id, &logistics, line(items[0], 5)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    let second = engine.create_batch(id, &logistics, line(items[0], 4)).unwrap();
    assert_eq!(second.batch_number(), 2);

    engine.update_batch(first.id_typed(), &logistics, dispatch()).unwrap();
    assert_eq!(status_of(&engine, id), S::Shipped);
    engine.update_batch(second.id_typed(), &logistics, dispatch()).unwrap();

    engine.advance_batch(first.id_typed(), &receiver, BatchAction::Depart).unwrap_err();
    engine.advance_batch(first.id_typed(), &logistics, BatchAction::Depart).unwrap();
    engine.advance_batch(first.id_typed(), &receiver, BatchAction::Receive).unwrap();
    assert_eq!(status_of(&engine, id), S::PartiallyDelivered);

    engine
        .schedule_pickup(
            second.id_typed(),
            &receiver,
            NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            "Warehouse gate 2, morning",
        )
        .unwrap();
    let received = engine.advance_batch(second.id_typed(), &receiver, BatchAction::Receive).unwrap();
    assert_eq!(received.status(), BatchStatus::Received);
    assert_eq!(status_of(&engine, id), S::FullyDelivered);

    let delivered: Vec<_> = engine
        .sink()
        .sent()
        .into_iter()
        .filter(|n| n.kind == NotificationKind::RequisitionDelivered)
        .collect();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].is_addressed_to_user(owner.user_id()));

    let trail = engine.timeline(id, &owner).unwrap();
    trail.verify_chain(S::ReadyToDispatch).unwrap();
    assert_eq!(trail.current_status(S::ReadyToDispatch), S::FullyDelivered);
    assert_eq!(trail.status_changes().count(), 3);
}

#[test]
fn failed_actions_leave_no_trace() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let (id, _) = seed(&engine, &owner, &[3], S::SecurityReview);

    let failures = [
        engine.approve(id, &actor(Role::Logistics), None).unwrap_err(),
        engine.reject(id, &actor(Role::Security), "too short").unwrap_err(),
        engine.submit(id, &owner).unwrap_err(),
        engine.process(id, &actor(Role::Admin), S::Purchasing).unwrap_err(),
        engine.process(id, &actor(Role::Admin), S::Draft).unwrap_err(),
    ];
    let kinds: Vec<ErrorKind> = failures.iter().map(WorkflowError::kind).collect();
    assert_eq!(
        kinds,
        vec![
            ErrorKind::Forbidden,
            ErrorKind::ValidationFailed,
            ErrorKind::InvalidTransition,
            ErrorKind::InvalidTransition,
            ErrorKind::ValidationFailed,
        ]
    );

    assert_eq!(status_of(&engine, id), S::SecurityReview);
    assert!(history(&engine, id).is_empty());
    assert!(engine.store().outbox().unwrap().is_empty());
    assert!(engine.sink().sent().is_empty());
}

#[test]
fn short_rejection_fails_before_anything_else() {
    let engine = engine();
    let err = engine
        .reject(RequisitionId::new(), &actor(Role::Requester), "  no  ")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[test]
fn submit_checks_ownership_then_status_then_items() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let (empty, _) = seed(&engine, &owner, &[], S::Draft);

    assert_eq!(engine.submit(empty, &actor(Role::Requester)).unwrap_err().kind(), ErrorKind::Forbidden);
    assert_eq!(engine.submit(empty, &owner).unwrap_err().kind(), ErrorKind::ValidationFailed);

    let (full, _) = seed(&engine, &owner, &[2], S::Draft);
    engine.submit(full, &actor(Role::Superadmin)).unwrap();
    assert_eq!(engine.submit(full, &owner).unwrap_err().kind(), ErrorKind::InvalidTransition);

    assert_eq!(engine.submit(RequisitionId::new(), &owner).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn process_respects_narrow_map_and_roles() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let (id, _) = seed(&engine, &owner, &[2], S::LogisticsReview);

    let err = engine.process(id, &actor(Role::Administration), S::Purchasing).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    engine.process(id, &actor(Role::Logistics), S::Purchasing).unwrap();
    let req = engine.process(id, &actor(Role::Administration), S::ReadyToDispatch).unwrap();
    assert_eq!(req.status(), S::ReadyToDispatch);

    let err = engine.process(id, &actor(Role::Administration), S::Shipped).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let entries = history(&engine, id);
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.comment.is_some()));
    assert!(engine.sink().sent().is_empty());
}

#[test]
fn purchasing_approval_releases_to_dispatch_and_tells_owner() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let (id, _) = seed(&engine, &owner, &[2], S::Purchasing);

    engine.approve(id, &actor(Role::Administration), None).unwrap();
    assert_eq!(status_of(&engine, id), S::ReadyToDispatch);

    let sent = engine.sink().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::ReadyToDispatch);
    assert!(sent[0].is_addressed_to_user(owner.user_id()));
}

#[test]
fn comments_are_pinned_to_current_status() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let (id, _) = seed(&engine, &owner, &[2], S::ManagementReview);

    let entry = engine.comment(id, &actor(Role::Receiver), "  stock confirmed  ").unwrap();
    assert!(entry.is_comment_only());
    assert_eq!(entry.new_status, S::ManagementReview);
    assert_eq!(entry.comment.as_deref(), Some("stock confirmed"));

    assert_eq!(engine.comment(id, &owner, "   ").unwrap_err().kind(), ErrorKind::ValidationFailed);
    assert_eq!(
        engine.comment(id, &actor(Role::Requester), "me too").unwrap_err().kind(),
        ErrorKind::Forbidden
    );
    assert_eq!(history(&engine, id).len(), 1);
    assert_eq!(status_of(&engine, id), S::ManagementReview);
}

#[test]
fn approved_quantities_bound_later_batches() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let logistics = actor(Role::Logistics);
    let (id, items) = seed(&engine, &owner, &[10], S::Purchasing);

    let err = engine.set_approved_quantities(id, &actor(Role::Security), &[(items[0], 5)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = engine.set_approved_quantities(id, &logistics, &[(items[0], 11)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    engine.set_approved_quantities(id, &logistics, &[(items[0], 5)]).unwrap();
    engine.create_batch(id, &logistics, line(items[0], 4)).unwrap();

    let err = engine.create_batch(id, &logistics, line(items[0], 2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    let err = engine.set_approved_quantities(id, &logistics, &[(items[0], 3)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[test]
fn dispatch_waits_for_purchasing_to_finish() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let logistics = actor(Role::Logistics);
    let (id, items) = seed(&engine, &owner, &[4], S::Purchasing);

    let batch = engine.create_batch(id, &logistics, line(items[0], 4)).unwrap();
    let err = engine.update_batch(batch.id_typed(), &logistics, dispatch()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let stored = engine.store().load_batch(batch.id_typed()).unwrap().unwrap();
    assert_eq!(stored.status(), BatchStatus::Pending);
}

#[test]
fn batches_need_an_eligible_parent_and_a_dispatcher() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let (review, items) = seed(&engine, &owner, &[4], S::LogisticsReview);
    let err = engine.create_batch(review, &actor(Role::Logistics), line(items[0], 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let (ready, items) = seed(&engine, &owner, &[4], S::ReadyToDispatch);
    let err = engine.create_batch(ready, &actor(Role::Receiver), line(items[0], 1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = engine.create_batch(ready, &actor(Role::Logistics), NewBatch::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[test]
fn dispatched_batches_are_frozen() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let logistics = actor(Role::Logistics);
    let (id, items) = seed(&engine, &owner, &[4], S::ReadyToDispatch);
    let batch = engine.create_batch(id, &logistics, line(items[0], 4)).unwrap();

    let prepared = engine
        .update_batch(
            batch.id_typed(),
            &logistics,
            BatchPatch {
                carrier: Some("DHL".into()),
                status: Some(BatchStatus::Preparing),
                ..BatchPatch::default()
            },
        )
        .unwrap();
    assert_eq!(prepared.status(), BatchStatus::Preparing);
    assert_eq!(prepared.carrier(), Some("DHL"));
    assert_eq!(status_of(&engine, id), S::ReadyToDispatch);

    engine.update_batch(batch.id_typed(), &logistics, dispatch()).unwrap();
    let err = engine
        .update_batch(
            batch.id_typed(),
            &logistics,
            BatchPatch {
                notes: Some("late".into()),
                ..BatchPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn pickups_belong_to_receivers() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let logistics = actor(Role::Logistics);
    let (id, items) = seed(&engine, &owner, &[4], S::ReadyToDispatch);
    let batch = engine.create_batch(id, &logistics, line(items[0], 4)).unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();

    let err = engine.schedule_pickup(batch.id_typed(), &actor(Role::Receiver), date, "Dock 3 at noon").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    engine.update_batch(batch.id_typed(), &logistics, dispatch()).unwrap();
    let err = engine.schedule_pickup(batch.id_typed(), &logistics, date, "Dock 3 at noon").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = engine.schedule_pickup(batch.id_typed(), &actor(Role::Receiver), date, "soon").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    let inbox = engine.sink().subscribe();
    let batch = engine.schedule_pickup(batch.id_typed(), &actor(Role::Receiver), date, "Dock 3 at noon").unwrap();
    assert_eq!(batch.status(), BatchStatus::PendingReceipt);
    assert_eq!(batch.estimated_pickup_date(), Some(date));

    let notes = inbox.drain();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::PickupScheduled);
    assert!(notes[0].is_addressed_to_role(Role::Logistics));

    let err = engine
        .advance_batch(batch.id_typed(), &actor(Role::Receiver), BatchAction::SchedulePickup)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[test]
fn batches_freeze_once_the_parent_is_rejected() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let logistics = actor(Role::Logistics);
    let receiver = actor(Role::Receiver);
    let (id, items) = seed(&engine, &owner, &[10], S::Purchasing);
    let batch = engine.create_batch(id, &logistics, line(items[0], 5)).unwrap();

    engine
        .reject(id, &actor(Role::Administration), "budget was cancelled")
        .unwrap();
    assert_eq!(status_of(&engine, id), S::RejectedByAdministration);
    let before = history(&engine, id).len();

    let err = engine.update_batch(batch.id_typed(), &logistics, dispatch()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let notes = BatchPatch {
        notes: Some("hold at dock".into()),
        ..BatchPatch::default()
    };
    let err = engine.update_batch(batch.id_typed(), &logistics, notes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    for action in [BatchAction::Prepare, BatchAction::Depart, BatchAction::Receive] {
        let err = engine.advance_batch(batch.id_typed(), &logistics, action).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition, "{action}");
    }
    let date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
    let err = engine
        .schedule_pickup(batch.id_typed(), &receiver, date, "Dock 3 at noon")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let stored = engine.store().load_batch(batch.id_typed()).unwrap().unwrap();
    assert_eq!(stored.status(), BatchStatus::Pending);
    assert_eq!(stored.notes(), None);
    assert_eq!(history(&engine, id).len(), before);
    assert_eq!(
        engine.batch_capabilities(batch.id_typed(), &logistics).unwrap(),
        BatchCapabilities::default()
    );
}

#[test]
fn batches_freeze_once_the_parent_is_processed_to_delivered() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let logistics = actor(Role::Logistics);
    let (id, items) = seed(&engine, &owner, &[4], S::ReadyToDispatch);
    let batch = engine.create_batch(id, &logistics, line(items[0], 4)).unwrap();
    engine.update_batch(batch.id_typed(), &logistics, dispatch()).unwrap();
    assert_eq!(status_of(&engine, id), S::Shipped);

    engine.process(id, &logistics, S::FullyDelivered).unwrap();
    let before = history(&engine, id).len();

    let err = engine.advance_batch(batch.id_typed(), &logistics, BatchAction::Depart).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let date = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap();
    let err = engine
        .schedule_pickup(batch.id_typed(), &actor(Role::Receiver), date, "Dock 3 at noon")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    let stored = engine.store().load_batch(batch.id_typed()).unwrap().unwrap();
    assert_eq!(stored.status(), BatchStatus::Dispatched);
    assert_eq!(history(&engine, id).len(), before);
}

#[test]
fn capabilities_and_visibility() {
    let engine = engine();
    let owner = actor(Role::Requester);
    let (id, _) = seed(&engine, &owner, &[1], S::Draft);

    let caps = engine.capabilities(id, &owner).unwrap();
    assert!(caps.can_submit && caps.can_edit_items);
    assert!(!engine.capabilities(id, &actor(Role::Requester)).unwrap().can_view);

    let err = engine.timeline(id, &actor(Role::Requester)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = engine.batches(id, &actor(Role::Requester)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(engine.batches(id, &actor(Role::Security)).unwrap().is_empty());

    let err = engine.batch_capabilities(BatchId::new(), &owner).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

/// Serves a fixed snapshot of one requisition, as if another writer moved it
/// after we read it.
struct StaleReads {
    inner: InMemoryWorkflowStore,
    snapshot: Mutex<Option<Requisition>>,
}

impl WorkflowStore for StaleReads {
    fn load_requisition(&self, id: RequisitionId) -> Result<Option<Requisition>, StoreError> {
        match self.snapshot.lock().unwrap().clone() {
            Some(req) if req.id_typed() == id => Ok(Some(req)),
            _ => self.inner.load_requisition(id),
        }
    }

    fn load_batch(&self, id: BatchId) -> Result<Option<ShipmentBatch>, StoreError> {
        self.inner.load_batch(id)
    }

    fn list_batches(&self, requisition_id: RequisitionId) -> Result<Vec<ShipmentBatch>, StoreError> {
        self.inner.list_batches(requisition_id)
    }

    fn history(&self, requisition_id: RequisitionId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        self.inner.history(requisition_id)
    }

    fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        self.inner.commit(changeset)
    }
}

#[test]
fn stale_reads_fail_with_conflict() {
    let owner = actor(Role::Requester);
    let mut req = Requisition::draft(RequisitionId::new(), owner.user_id(), Utc::now());
    req.add_item("gloves", 2, Utc::now()).unwrap();
    let id = req.id_typed();

    let inner = InMemoryWorkflowStore::new();
    let mut moved = req.clone();
    moved.transition_to(S::SecurityReview, Utc::now()).unwrap();
    inner.insert_requisition(moved).unwrap();

    let engine = WorkflowEngine::new(
        StaleReads {
            inner,
            snapshot: Mutex::new(Some(req)),
        },
        InMemoryNotificationSink::new(),
    );

    let err = engine.submit(id, &owner).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(engine.store().inner.history(id).unwrap().is_empty());
    assert!(engine.sink().sent().is_empty());
}

/// Lets one extra write land on the shared store right before the next
/// commit, as if another request ran between our read and our write.
struct Interleaved {
    inner: Arc<InMemoryWorkflowStore>,
    before_commit: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Interleaved {
    fn new(inner: Arc<InMemoryWorkflowStore>) -> Self {
        Self {
            inner,
            before_commit: Mutex::new(None),
        }
    }

    fn before_next_commit(&self, write: impl FnOnce() + Send + 'static) {
        *self.before_commit.lock().unwrap() = Some(Box::new(write));
    }
}

impl WorkflowStore for Interleaved {
    fn load_requisition(&self, id: RequisitionId) -> Result<Option<Requisition>, StoreError> {
        self.inner.load_requisition(id)
    }

    fn load_batch(&self, id: BatchId) -> Result<Option<ShipmentBatch>, StoreError> {
        self.inner.load_batch(id)
    }

    fn list_batches(&self, requisition_id: RequisitionId) -> Result<Vec<ShipmentBatch>, StoreError> {
        self.inner.list_batches(requisition_id)
    }

    fn history(&self, requisition_id: RequisitionId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        self.inner.history(requisition_id)
    }

    fn commit(&self, changeset: Changeset) -> Result<(), StoreError> {
        let pending = self.before_commit.lock().unwrap().take();
        if let Some(write) = pending {
            write();
        }
        self.inner.commit(changeset)
    }
}

fn shipped(store: &InMemoryWorkflowStore, id: RequisitionId, item: RequisitionItemId) -> u64 {
    let batches = store.list_batches(id).unwrap();
    BatchReconciler::allocated(&batches).get(&item).copied().unwrap_or(0)
}

#[test]
fn batch_landing_during_quantity_review_conflicts() {
    let shared = Arc::new(InMemoryWorkflowStore::new());
    let owner = actor(Role::Requester);
    let logistics = actor(Role::Logistics);
    let (id, items) = seed_store(&shared, &owner, &[10], S::Purchasing);
    let item = items[0];

    let engine = WorkflowEngine::new(Interleaved::new(shared.clone()), InMemoryNotificationSink::new());
    let other = WorkflowEngine::new(shared.clone(), InMemoryNotificationSink::new());
    engine.store().before_next_commit(move || {
        other.create_batch(id, &logistics, line(item, 8)).unwrap();
    });

    let err = engine.set_approved_quantities(id, &logistics, &[(item, 5)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let stored = shared.load_requisition(id).unwrap().unwrap();
    assert_eq!(stored.items()[0].approved_quantity, None);
    assert_eq!(shipped(&shared, id, item), 8);
    assert!(shipped(&shared, id, item) <= u64::from(stored.items()[0].approved_or_requested()));

    // On fresh data the review sees the batch and cannot go below it.
    let err = engine.set_approved_quantities(id, &logistics, &[(item, 5)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
}

#[test]
fn quantity_review_landing_during_batch_creation_conflicts() {
    let shared = Arc::new(InMemoryWorkflowStore::new());
    let owner = actor(Role::Requester);
    let logistics = actor(Role::Logistics);
    let (id, items) = seed_store(&shared, &owner, &[10], S::Purchasing);
    let item = items[0];

    let engine = WorkflowEngine::new(Interleaved::new(shared.clone()), InMemoryNotificationSink::new());
    let other = WorkflowEngine::new(shared.clone(), InMemoryNotificationSink::new());
    engine.store().before_next_commit(move || {
        other.set_approved_quantities(id, &logistics, &[(item, 5)]).unwrap();
    });

    let err = engine.create_batch(id, &logistics, line(item, 8)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(shared.list_batches(id).unwrap().is_empty());

    let err = engine.create_batch(id, &logistics, line(item, 8)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    engine.create_batch(id, &logistics, line(item, 5)).unwrap();
    assert_eq!(shipped(&shared, id, item), 5);
}

#[test]
fn concurrent_quantity_reviews_do_not_lose_updates() {
    let shared = Arc::new(InMemoryWorkflowStore::new());
    let owner = actor(Role::Requester);
    let logistics = actor(Role::Logistics);
    let (id, items) = seed_store(&shared, &owner, &[10, 6], S::LogisticsReview);
    let (first, second) = (items[0], items[1]);

    let engine = WorkflowEngine::new(Interleaved::new(shared.clone()), InMemoryNotificationSink::new());
    let other = WorkflowEngine::new(shared.clone(), InMemoryNotificationSink::new());
    engine.store().before_next_commit(move || {
        other.set_approved_quantities(id, &logistics, &[(first, 3)]).unwrap();
    });

    let err = engine.set_approved_quantities(id, &logistics, &[(second, 4)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    engine.set_approved_quantities(id, &logistics, &[(second, 4)]).unwrap();
    let stored = shared.load_requisition(id).unwrap().unwrap();
    assert_eq!(stored.items()[0].approved_quantity, Some(3));
    assert_eq!(stored.items()[1].approved_quantity, Some(4));
}

struct BrokenSink;

impl NotificationSink for BrokenSink {
    type Error = &'static str;

    fn send(&self, _request: NotificationRequest) -> Result<(), Self::Error> {
        Err("smtp down")
    }

    fn subscribe(&self) -> Subscription<NotificationRequest> {
        Subscription::new(std::sync::mpsc::channel().1)
    }
}

#[test]
fn sink_failures_do_not_undo_commits() {
    let engine = WorkflowEngine::new(Arc::new(InMemoryWorkflowStore::new()), BrokenSink);
    let owner = actor(Role::Requester);
    let (id, _) = seed(&engine, &owner, &[1], S::Draft);

    engine.submit(id, &owner).unwrap();
    assert_eq!(engine.store().outbox().unwrap().len(), 1);
    assert_eq!(engine.store().history(id).unwrap().len(), 1);
}

struct Unavailable;

impl WorkflowStore for Unavailable {
    fn load_requisition(&self, _id: RequisitionId) -> Result<Option<Requisition>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn load_batch(&self, _id: BatchId) -> Result<Option<ShipmentBatch>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn list_batches(&self, _id: RequisitionId) -> Result<Vec<ShipmentBatch>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn history(&self, _id: RequisitionId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn commit(&self, _changeset: Changeset) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[test]
fn store_outages_surface_as_internal() {
    let engine = WorkflowEngine::new(Unavailable, InMemoryNotificationSink::new());
    let err = engine.submit(RequisitionId::new(), &actor(Role::Admin)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[derive(Debug, Clone)]
enum Op {
    Submit,
    Approve,
    Reject,
    Process(S),
}

fn any_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Submit),
        Just(Op::Approve),
        Just(Op::Reject),
        proptest::sample::select(S::ALL.to_vec()).prop_map(Op::Process),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn one_audit_entry_per_successful_transition(
        steps in proptest::collection::vec(
            (any_op(), proptest::sample::select(Role::ALL.to_vec()), any::<bool>()),
            1..16,
        ),
    ) {
        let engine = engine();
        let owner = actor(Role::Requester);
        let (id, _) = seed(&engine, &owner, &[5], S::Draft);

        for (op, role, as_owner) in steps {
            let who = if as_owner { Actor::new(owner.user_id(), role) } else { actor(role) };
            let before_status = status_of(&engine, id);
            let before_len = history(&engine, id).len();

            let result = match op {
                Op::Submit => engine.submit(id, &who),
                Op::Approve => engine.approve(id, &who, None),
                Op::Reject => engine.reject(id, &who, "not compliant with policy"),
                Op::Process(target) => engine.process(id, &who, target),
            };

            let after = history(&engine, id);
            match result {
                Ok(req) => {
                    prop_assert_eq!(after.len(), before_len + 1);
                    let last = after.last().unwrap();
                    prop_assert_eq!(last.previous_status, before_status);
                    prop_assert_eq!(last.new_status, req.status());
                    prop_assert_ne!(before_status, req.status());
                }
                Err(e) => {
                    prop_assert_eq!(after.len(), before_len);
                    prop_assert_eq!(status_of(&engine, id), before_status);
                    prop_assert!(matches!(
                        e.kind(),
                        ErrorKind::Forbidden | ErrorKind::InvalidTransition | ErrorKind::ValidationFailed
                    ));
                }
            }
        }

        let trail = engine.timeline(id, &owner).unwrap();
        prop_assert!(trail.verify_chain(S::Draft).is_ok());
    }
}
