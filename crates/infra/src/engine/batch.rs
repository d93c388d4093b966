use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{Level, info, instrument};

use supplygate_auth::{Actor, authorize};
use supplygate_core::{AggregateRoot, BatchId, DomainError, ExpectedStatus, RequisitionId};
use supplygate_notifications::{NotificationEnvelope, NotificationRequest, NotificationSink};
use supplygate_requisitions::{
    BATCH_ELIGIBLE, DISPATCHERS, PermissionResolver, Requisition, RequisitionStatus, StateGraph,
    StatusHistoryEntry,
};
use supplygate_shipments::{
    BatchAction, BatchCapabilities, BatchDetails, BatchLineItem, BatchPatch, BatchReconciler,
    BatchStateGraph, BatchStatus, ShipmentBatch,
};

use super::{WorkflowEngine, notify};
use crate::error::WorkflowResult;
use crate::store::{Changeset, WorkflowStore};

/// Input for opening a shipment batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    pub lines: Vec<BatchLineItem>,
    #[serde(flatten)]
    pub details: BatchDetails,
}

impl<S, N> WorkflowEngine<S, N>
where
    S: WorkflowStore,
    N: NotificationSink,
{
    /// Open batch number `existing + 1` against a dispatch-eligible requisition.
    #[instrument(skip_all, fields(requisition_id = %requisition_id, role = %actor.role()), err(level = Level::WARN))]
    pub fn create_batch(
        &self,
        requisition_id: RequisitionId,
        actor: &Actor,
        new: NewBatch,
    ) -> WorkflowResult<ShipmentBatch> {
        let requisition = self.load_requisition(requisition_id)?;
        authorize(actor, DISPATCHERS, "create a shipment batch")?;

        if !BATCH_ELIGIBLE.contains(&requisition.status()) {
            return Err(DomainError::invalid_transition(format!(
                "cannot open a shipment batch while the requisition is '{}'",
                requisition.status()
            ))
            .into());
        }

        let existing = self.store.list_batches(requisition_id)?;
        let lines = BatchReconciler::allocate(&requisition, &existing, &new.lines)?;
        let number = self.store.count_batches(requisition_id)? + 1;
        let now = self.now();

        let batch = ShipmentBatch::open(
            BatchId::new(),
            requisition_id,
            number,
            lines,
            new.details,
            actor.user_id(),
            now,
        )?;
        let entry = StatusHistoryEntry::comment_only(
            requisition_id,
            requisition.status(),
            actor,
            format!("shipment batch #{number} opened with {} line(s)", batch.lines().len()),
            now,
        );

        self.commit_and_notify(
            Changeset::new()
                .guard(&requisition)
                .insert_batch(batch.clone())
                .audit(entry),
        )?;
        info!(batch_id = %batch.id_typed(), batch_number = number, "shipment batch opened");
        Ok(batch)
    }

    /// Edit carrier/destination/notes and optionally move a batch that has
    /// not left yet to `preparing` or `dispatched`.
    #[instrument(skip_all, fields(batch_id = %batch_id, role = %actor.role()), err(level = Level::WARN))]
    pub fn update_batch(
        &self,
        batch_id: BatchId,
        actor: &Actor,
        patch: BatchPatch,
    ) -> WorkflowResult<ShipmentBatch> {
        let mut batch = self.load_batch(batch_id)?;
        authorize(actor, DISPATCHERS, "update a shipment batch")?;
        let requisition = self.load_open_parent(&batch)?;
        batch.ensure_editable()?;
        if patch.is_empty() {
            return Err(DomainError::validation("the patch does not change anything").into());
        }

        let expected = ExpectedStatus::of(&batch);
        let now = self.now();
        batch.apply_details(&patch, now)?;

        let target = patch.status.filter(|s| *s != batch.status());
        let Some(target) = target else {
            self.commit_and_notify(
                Changeset::new()
                    .guard(&requisition)
                    .update_batch(expected, batch.clone()),
            )?;
            return Ok(batch);
        };

        let action = BatchStateGraph::action_between(batch.status(), target).ok_or_else(|| {
            DomainError::invalid_transition(format!(
                "a batch cannot move from '{}' to '{target}'",
                batch.status()
            ))
        })?;
        self.move_batch(batch, expected, requisition, action, actor, now)
    }

    /// Record the estimated pickup and move the batch to `pending-receipt`.
    #[instrument(skip_all, fields(batch_id = %batch_id, role = %actor.role()), err(level = Level::WARN))]
    pub fn schedule_pickup(
        &self,
        batch_id: BatchId,
        actor: &Actor,
        estimated_date: NaiveDate,
        note: &str,
    ) -> WorkflowResult<ShipmentBatch> {
        let mut batch = self.load_batch(batch_id)?;
        authorize(
            actor,
            BatchStateGraph::roles_for(BatchAction::SchedulePickup),
            "schedule a pickup",
        )?;

        let requisition = self.load_open_parent(&batch)?;

        let expected = ExpectedStatus::of(&batch);
        let now = self.now();
        batch.schedule_pickup(estimated_date, note, now)?;

        let note = batch.pickup_note().unwrap_or_default().to_string();
        let entry = StatusHistoryEntry::comment_only(
            requisition.id_typed(),
            requisition.status(),
            actor,
            format!(
                "pickup for batch #{} scheduled on {estimated_date}: {note}",
                batch.batch_number()
            ),
            now,
        );
        let notification = notify::pickup_scheduled(&batch, estimated_date, &note);

        self.commit_and_notify(
            Changeset::new()
                .guard(&requisition)
                .update_batch(expected, batch.clone())
                .audit(entry)
                .notify(NotificationEnvelope::new(notification, now)),
        )?;
        Ok(batch)
    }

    /// Drive a batch along its graph (depart, receive, and the pre-dispatch
    /// moves). Pickups carry extra data and go through
    /// [`WorkflowEngine::schedule_pickup`].
    #[instrument(skip_all, fields(batch_id = %batch_id, role = %actor.role(), action = %action), err(level = Level::WARN))]
    pub fn advance_batch(
        &self,
        batch_id: BatchId,
        actor: &Actor,
        action: BatchAction,
    ) -> WorkflowResult<ShipmentBatch> {
        if action == BatchAction::SchedulePickup {
            return Err(DomainError::validation("pickups need a date and a note; schedule them explicitly").into());
        }
        let batch = self.load_batch(batch_id)?;
        let requisition = self.load_open_parent(&batch)?;
        let expected = ExpectedStatus::of(&batch);
        self.move_batch(batch, expected, requisition, action, actor, self.now())
    }

    /// Batches of a requisition, by number.
    #[instrument(skip_all, fields(requisition_id = %requisition_id, role = %actor.role()), err(level = Level::WARN))]
    pub fn batches(&self, requisition_id: RequisitionId, actor: &Actor) -> WorkflowResult<Vec<ShipmentBatch>> {
        let requisition = self.load_requisition(requisition_id)?;
        if !PermissionResolver::for_requisition(&requisition, actor).can_view {
            return Err(DomainError::forbidden("not allowed to view this requisition").into());
        }
        Ok(self.store.list_batches(requisition_id)?)
    }

    pub fn batch_capabilities(&self, batch_id: BatchId, actor: &Actor) -> WorkflowResult<BatchCapabilities> {
        let batch = self.load_batch(batch_id)?;
        let requisition = self.load_requisition(batch.requisition_id())?;
        if StateGraph::is_terminal(requisition.status()) {
            return Ok(BatchCapabilities::default());
        }
        Ok(BatchCapabilities::resolve(batch.status(), actor.role()))
    }

    /// Parent of `batch`, refusing requisitions that are already closed.
    fn load_open_parent(&self, batch: &ShipmentBatch) -> WorkflowResult<Requisition> {
        let requisition = self.load_requisition(batch.requisition_id())?;
        if StateGraph::is_terminal(requisition.status()) {
            return Err(DomainError::invalid_transition(format!(
                "batch #{} belongs to a requisition that is '{}'",
                batch.batch_number(),
                requisition.status()
            ))
            .into());
        }
        Ok(requisition)
    }

    /// Apply one batch edge plus whatever it does to the parent requisition,
    /// in a single changeset. `requisition` is the open parent as read by the
    /// caller; its status and revision guard the commit.
    fn move_batch(
        &self,
        mut batch: ShipmentBatch,
        expected: ExpectedStatus<BatchStatus>,
        requisition: Requisition,
        action: BatchAction,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> WorkflowResult<ShipmentBatch> {
        let edge = BatchStateGraph::resolve(batch.status(), action, actor.role())?;
        batch.transition_to(edge.to, now);

        let parent_target = match action {
            BatchAction::Dispatch => match requisition.status() {
                RequisitionStatus::ReadyToDispatch => Some(RequisitionStatus::Shipped),
                RequisitionStatus::Purchasing => {
                    return Err(DomainError::invalid_transition(
                        "batches cannot be dispatched while the requisition is still in purchasing",
                    )
                    .into());
                }
                _ => None,
            },
            BatchAction::Receive => {
                let mut batches = self.store.list_batches(requisition.id_typed())?;
                for stored in batches.iter_mut() {
                    if stored.id_typed() == batch.id_typed() {
                        *stored = batch.clone();
                    }
                }
                BatchReconciler::reconcile(&requisition, &batches)
            }
            BatchAction::Prepare | BatchAction::Depart | BatchAction::SchedulePickup => None,
        };

        let remark = format!("batch #{} {}: now '{}'", batch.batch_number(), action, batch.status());
        let changeset = Changeset::new().update_batch(expected, batch.clone());
        let changeset = match parent_target {
            Some(target) => self.parent_transition(changeset, requisition, target, actor, remark, now)?,
            None => {
                let entry = StatusHistoryEntry::comment_only(
                    requisition.id_typed(),
                    requisition.status(),
                    actor,
                    remark,
                    now,
                );
                changeset.guard(&requisition).audit(entry)
            }
        };

        self.commit_and_notify(changeset)?;
        Ok(batch)
    }

    /// Add a requisition status change driven by a batch to `changeset`.
    fn parent_transition(
        &self,
        changeset: Changeset,
        mut requisition: Requisition,
        target: RequisitionStatus,
        actor: &Actor,
        remark: String,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Changeset> {
        let from = requisition.status();
        if StateGraph::can_transition(from, target, actor.role()).is_none() {
            return Err(DomainError::forbidden(format!(
                "role '{}' may not move a requisition from '{from}' to '{target}'",
                actor.role()
            ))
            .into());
        }

        let expected = ExpectedStatus::of(&requisition);
        requisition.transition_to(target, now)?;
        info!(requisition_id = %requisition.id_typed(), %from, to = %target, "batch moved requisition");

        let notifications: Vec<NotificationRequest> = if target == RequisitionStatus::FullyDelivered {
            vec![notify::fully_delivered(&requisition)]
        } else {
            Vec::new()
        };
        let entry = StatusHistoryEntry::transition(requisition.id_typed(), from, target, actor, Some(remark), now);

        let mut changeset = changeset.update(expected, requisition).audit(entry);
        for request in notifications {
            changeset = changeset.notify(NotificationEnvelope::new(request, now));
        }
        Ok(changeset)
    }
}
