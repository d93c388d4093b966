//! Capability resolution: the single answer to "who may do X in state Y".
//!
//! Built on [`StateGraph`] plus the per-capability rules that are not plain
//! edges (item editing, ownership-gated submission, read access).

use serde::{Deserialize, Serialize};

use supplygate_auth::{Actor, Role, RoleSet};
use supplygate_core::AggregateRoot;

use crate::{Action, Requisition, RequisitionStatus, StateGraph};

/// Statuses in which shipment batches may be opened.
pub const BATCH_ELIGIBLE: [RequisitionStatus; 4] = [
    RequisitionStatus::ReadyToDispatch,
    RequisitionStatus::Purchasing,
    RequisitionStatus::Shipped,
    RequisitionStatus::PartiallyDelivered,
];

/// Roles that may open and prepare shipment batches.
pub const DISPATCHERS: RoleSet = RoleSet::admins_and(Role::Logistics);

const ITEM_EDITORS: RoleSet = RoleSet::admins_and(Role::Logistics);
const RECEIVERS: RoleSet = RoleSet::admins_and(Role::Receiver).with(Role::Logistics);

/// Fine-grained capabilities of one actor on one requisition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub can_view: bool,
    pub can_edit_items: bool,
    pub can_submit: bool,
    pub can_approve: bool,
    pub can_reject: bool,
    pub can_process: bool,
    pub can_dispatch: bool,
    pub can_receive: bool,
    pub can_comment: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionResolver;

impl PermissionResolver {
    /// Resolve capabilities from raw inputs.
    ///
    /// Ownership only ever matters for viewing, editing and submitting; review
    /// rights come from role membership alone.
    pub fn resolve(
        status: RequisitionStatus,
        role: Role,
        is_owner: bool,
        active_items: usize,
    ) -> Capabilities {
        let can_view = is_owner || role.is_staff();
        let is_draft = status == RequisitionStatus::Draft;
        let available = StateGraph::available_transitions(status, role);
        let has_action = |action: Action| available.iter().any(|t| t.action == action);

        Capabilities {
            can_view,
            can_edit_items: is_draft && (is_owner || ITEM_EDITORS.contains(role)),
            can_submit: is_draft && (is_owner || role.is_admin()) && active_items > 0,
            can_approve: has_action(Action::Approve),
            can_reject: has_action(Action::Reject),
            can_process: StateGraph::process_targets(status)
                .iter()
                .any(|target| StateGraph::process_roles(*target).contains(role)),
            can_dispatch: DISPATCHERS.contains(role) && BATCH_ELIGIBLE.contains(&status),
            can_receive: RECEIVERS.contains(role)
                && matches!(
                    status,
                    RequisitionStatus::Shipped | RequisitionStatus::PartiallyDelivered
                ),
            can_comment: can_view,
        }
    }

    pub fn for_requisition(requisition: &Requisition, actor: &Actor) -> Capabilities {
        Self::resolve(
            requisition.status(),
            actor.role(),
            requisition.is_owned_by(actor.user_id()),
            requisition.active_item_count(),
        )
    }
}
