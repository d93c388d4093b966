use tracing::{Level, instrument};

use supplygate_auth::{Actor, Role, RoleSet, authorize};
use supplygate_core::{AggregateRoot, DomainError, ExpectedStatus, RequisitionId, RequisitionItemId};
use supplygate_notifications::{NotificationEnvelope, NotificationRequest, NotificationSink};
use supplygate_requisitions::{
    Action, AuditTrail, Capabilities, MIN_COMMENT_CHARS, PROCESS_TARGETS, PermissionResolver,
    Requisition, RequisitionStatus, StateGraph, StatusHistoryEntry,
};
use supplygate_shipments::BatchReconciler;

use super::{WorkflowEngine, non_blank, notify};
use crate::error::WorkflowResult;
use crate::store::{Changeset, WorkflowStore};

const QUANTITY_REVIEWERS: RoleSet = RoleSet::admins_and(Role::Logistics);

impl<S, N> WorkflowEngine<S, N>
where
    S: WorkflowStore,
    N: NotificationSink,
{
    /// Draft → security-review, by the owner or an admin.
    #[instrument(skip_all, fields(requisition_id = %id, role = %actor.role()), err(level = Level::WARN))]
    pub fn submit(&self, id: RequisitionId, actor: &Actor) -> WorkflowResult<Requisition> {
        let requisition = self.load_requisition(id)?;

        if !(requisition.is_owned_by(actor.user_id()) || actor.is_admin()) {
            return Err(DomainError::forbidden("only the requester or an admin may submit a requisition").into());
        }
        if requisition.status() != RequisitionStatus::Draft {
            return Err(DomainError::invalid_transition(format!(
                "cannot submit a requisition in status '{}'",
                requisition.status()
            ))
            .into());
        }
        if requisition.active_item_count() == 0 {
            return Err(DomainError::validation("a requisition needs at least one item to be submitted").into());
        }

        let to = StateGraph::edges(RequisitionStatus::Draft, Action::Submit)
            .map(|t| t.to)
            .next()
            .ok_or_else(|| DomainError::invalid_transition("draft has no submit edge"))?;
        let notification = notify::submitted(&requisition);
        self.apply_transition(requisition, to, actor, None, vec![notification])
    }

    /// Take the approve edge of the current review gate.
    #[instrument(skip_all, fields(requisition_id = %id, role = %actor.role()), err(level = Level::WARN))]
    pub fn approve(
        &self,
        id: RequisitionId,
        actor: &Actor,
        comment: Option<String>,
    ) -> WorkflowResult<Requisition> {
        let requisition = self.load_requisition(id)?;
        let edge = StateGraph::resolve(requisition.status(), Action::Approve, actor.role())?;

        let notifications = notify::approved(&requisition, edge.to).into_iter().collect();
        self.apply_transition(requisition, edge.to, actor, comment, notifications)
    }

    /// Take the reject edge of the current review gate. The reason is
    /// mandatory and is forwarded to the owner.
    #[instrument(skip_all, fields(requisition_id = %id, role = %actor.role()), err(level = Level::WARN))]
    pub fn reject(&self, id: RequisitionId, actor: &Actor, comment: &str) -> WorkflowResult<Requisition> {
        let reason = comment.trim();
        if reason.chars().count() < MIN_COMMENT_CHARS {
            return Err(DomainError::validation(format!(
                "a rejection reason of at least {MIN_COMMENT_CHARS} characters is required"
            ))
            .into());
        }

        let requisition = self.load_requisition(id)?;
        let from = requisition.status();
        StateGraph::resolve(from, Action::Reject, actor.role())?;
        let to = StateGraph::rejection_target(from).ok_or_else(|| {
            DomainError::invalid_transition(format!("cannot reject a requisition in status '{from}'"))
        })?;

        let notification = notify::rejected(&requisition, to, reason);
        self.apply_transition(requisition, to, actor, Some(reason.to_string()), vec![notification])
    }

    /// Coarse downstream move chosen by logistics (or administration releasing
    /// purchased goods).
    #[instrument(skip_all, fields(requisition_id = %id, role = %actor.role(), target = %target), err(level = Level::WARN))]
    pub fn process(
        &self,
        id: RequisitionId,
        actor: &Actor,
        target: RequisitionStatus,
    ) -> WorkflowResult<Requisition> {
        if !PROCESS_TARGETS.contains(&target) {
            return Err(DomainError::validation(format!("'{target}' is not a valid processing target")).into());
        }

        let requisition = self.load_requisition(id)?;
        let from = requisition.status();
        if !StateGraph::process_targets(from).contains(&target) {
            return Err(DomainError::invalid_transition(format!(
                "cannot process a requisition from '{from}' to '{target}'"
            ))
            .into());
        }
        authorize(actor, StateGraph::process_roles(target), "process a requisition")?;

        let comment = format!("processed from '{from}' to '{target}'");
        self.apply_transition(requisition, target, actor, Some(comment), Vec::new())
    }

    /// Free-standing remark, pinned to the current status.
    #[instrument(skip_all, fields(requisition_id = %id, role = %actor.role()), err(level = Level::WARN))]
    pub fn comment(&self, id: RequisitionId, actor: &Actor, text: &str) -> WorkflowResult<StatusHistoryEntry> {
        let requisition = self.load_requisition(id)?;
        if !PermissionResolver::for_requisition(&requisition, actor).can_comment {
            return Err(DomainError::forbidden("not allowed to comment on this requisition").into());
        }
        let text = non_blank(text, "comment")?;

        let entry = StatusHistoryEntry::comment_only(id, requisition.status(), actor, text, self.now());
        self.commit_and_notify(Changeset::new().guard(&requisition).audit(entry.clone()))?;
        Ok(entry)
    }

    /// Record reviewed quantities during logistics review or purchasing.
    ///
    /// A quantity may not drop below what batches already carry for the item.
    #[instrument(skip_all, fields(requisition_id = %id, role = %actor.role(), items = quantities.len()), err(level = Level::WARN))]
    pub fn set_approved_quantities(
        &self,
        id: RequisitionId,
        actor: &Actor,
        quantities: &[(RequisitionItemId, u32)],
    ) -> WorkflowResult<Requisition> {
        let mut requisition = self.load_requisition(id)?;
        authorize(actor, QUANTITY_REVIEWERS, "set approved quantities")?;

        let status = requisition.status();
        if !matches!(status, RequisitionStatus::LogisticsReview | RequisitionStatus::Purchasing) {
            return Err(DomainError::invalid_transition(format!(
                "approved quantities cannot be changed in status '{status}'"
            ))
            .into());
        }
        if quantities.is_empty() {
            return Err(DomainError::validation("no quantities given").into());
        }

        let batches = self.store.list_batches(id)?;
        let allocated = BatchReconciler::allocated(&batches);
        let expected = ExpectedStatus::of(&requisition);
        let now = self.now();

        for (item_id, quantity) in quantities {
            let shipped = allocated.get(item_id).copied().unwrap_or(0);
            if u64::from(*quantity) < shipped {
                return Err(DomainError::validation(format!(
                    "item {item_id} already has {shipped} in shipment batches"
                ))
                .into());
            }
            requisition.set_approved_quantity(*item_id, *quantity, now)?;
        }

        let entry = StatusHistoryEntry::comment_only(
            id,
            status,
            actor,
            format!("approved quantities set for {} item(s)", quantities.len()),
            now,
        );
        self.commit_and_notify(Changeset::new().update(expected, requisition.clone()).audit(entry))?;
        Ok(requisition)
    }

    /// Audit trail in append order.
    #[instrument(skip_all, fields(requisition_id = %id, role = %actor.role()), err(level = Level::WARN))]
    pub fn timeline(&self, id: RequisitionId, actor: &Actor) -> WorkflowResult<AuditTrail> {
        let requisition = self.load_requisition(id)?;
        if !PermissionResolver::for_requisition(&requisition, actor).can_view {
            return Err(DomainError::forbidden("not allowed to view this requisition").into());
        }
        let entries = self.store.history(id)?;
        Ok(AuditTrail::from_entries(id, entries)?)
    }

    pub fn capabilities(&self, id: RequisitionId, actor: &Actor) -> WorkflowResult<Capabilities> {
        let requisition = self.load_requisition(id)?;
        Ok(PermissionResolver::for_requisition(&requisition, actor))
    }

    /// Move `requisition` to `to` and commit the change with its audit entry
    /// and notifications. Every check must already have passed.
    pub(super) fn apply_transition(
        &self,
        mut requisition: Requisition,
        to: RequisitionStatus,
        actor: &Actor,
        comment: Option<String>,
        notifications: Vec<NotificationRequest>,
    ) -> WorkflowResult<Requisition> {
        let expected = ExpectedStatus::of(&requisition);
        let from = requisition.status();
        let now = self.now();
        requisition.transition_to(to, now)?;

        let mut changeset = Changeset::new()
            .update(expected, requisition.clone())
            .audit(StatusHistoryEntry::transition(
                requisition.id_typed(),
                from,
                to,
                actor,
                comment,
                now,
            ));
        for request in notifications {
            changeset = changeset.notify(NotificationEnvelope::new(request, now));
        }

        self.commit_and_notify(changeset)?;
        Ok(requisition)
    }
}
