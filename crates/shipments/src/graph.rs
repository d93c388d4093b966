//! Shipment batch state graph.

use serde::{Deserialize, Serialize};

use supplygate_auth::{Role, RoleSet};
use supplygate_core::DomainError;

use crate::BatchStatus;
use crate::BatchStatus as B;

/// Minimum trimmed length of a pickup note.
pub const MIN_PICKUP_NOTE_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchAction {
    Prepare,
    Dispatch,
    Depart,
    SchedulePickup,
    Receive,
}

impl BatchAction {
    pub const ALL: [BatchAction; 5] = [
        BatchAction::Prepare,
        BatchAction::Dispatch,
        BatchAction::Depart,
        BatchAction::SchedulePickup,
        BatchAction::Receive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BatchAction::Prepare => "prepare",
            BatchAction::Dispatch => "dispatch",
            BatchAction::Depart => "depart",
            BatchAction::SchedulePickup => "schedule-pickup",
            BatchAction::Receive => "receive",
        }
    }
}

impl core::fmt::Display for BatchAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTransition {
    pub from: BatchStatus,
    pub to: BatchStatus,
    pub action: BatchAction,
    pub allowed: RoleSet,
}

impl BatchTransition {
    pub fn permits(&self, role: Role) -> bool {
        self.allowed.contains(role)
    }
}

const fn edge(from: B, to: B, action: BatchAction, allowed: RoleSet) -> BatchTransition {
    BatchTransition {
        from,
        to,
        action,
        allowed,
    }
}

const LOGISTICS: RoleSet = RoleSet::admins_and(Role::Logistics);
const PICKUP: RoleSet = RoleSet::admins_and(Role::Receiver);
const RECEIVERS: RoleSet = RoleSet::admins_and(Role::Receiver).with(Role::Logistics);

static FROM_PENDING: [BatchTransition; 2] = [
    edge(B::Pending, B::Preparing, BatchAction::Prepare, LOGISTICS),
    edge(B::Pending, B::Dispatched, BatchAction::Dispatch, LOGISTICS),
];

static FROM_PREPARING: [BatchTransition; 1] =
    [edge(B::Preparing, B::Dispatched, BatchAction::Dispatch, LOGISTICS)];

static FROM_DISPATCHED: [BatchTransition; 2] = [
    edge(B::Dispatched, B::InTransit, BatchAction::Depart, LOGISTICS),
    edge(B::Dispatched, B::PendingReceipt, BatchAction::SchedulePickup, PICKUP),
];

static FROM_IN_TRANSIT: [BatchTransition; 2] = [
    edge(B::InTransit, B::PendingReceipt, BatchAction::SchedulePickup, PICKUP),
    edge(B::InTransit, B::Received, BatchAction::Receive, RECEIVERS),
];

static FROM_PENDING_RECEIPT: [BatchTransition; 1] =
    [edge(B::PendingReceipt, B::Received, BatchAction::Receive, RECEIVERS)];

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchStateGraph;

impl BatchStateGraph {
    pub fn outgoing(from: BatchStatus) -> &'static [BatchTransition] {
        match from {
            B::Pending => &FROM_PENDING,
            B::Preparing => &FROM_PREPARING,
            B::Dispatched => &FROM_DISPATCHED,
            B::InTransit => &FROM_IN_TRANSIT,
            B::PendingReceipt => &FROM_PENDING_RECEIPT,
            B::Received => &[],
        }
    }

    pub fn available(from: BatchStatus, role: Role) -> Vec<BatchTransition> {
        Self::outgoing(from)
            .iter()
            .filter(|t| t.permits(role))
            .copied()
            .collect()
    }

    /// The action that moves `from` to `to`, if any.
    pub fn action_between(from: BatchStatus, to: BatchStatus) -> Option<BatchAction> {
        Self::outgoing(from).iter().find(|t| t.to == to).map(|t| t.action)
    }

    /// Look up `action` from `from` for `role`.
    ///
    /// A missing edge is an invalid transition; an edge closed to the role is
    /// forbidden.
    pub fn resolve(
        from: BatchStatus,
        action: BatchAction,
        role: Role,
    ) -> Result<BatchTransition, DomainError> {
        let edge = Self::outgoing(from)
            .iter()
            .find(|t| t.action == action)
            .ok_or_else(|| {
                DomainError::invalid_transition(format!("cannot {action} a batch in status '{from}'"))
            })?;

        if !edge.permits(role) {
            return Err(DomainError::forbidden(format!(
                "role '{role}' may not {action} a batch (allowed: {})",
                edge.allowed
            )));
        }
        Ok(*edge)
    }

    /// Roles that may perform `action` from any status.
    pub fn roles_for(action: BatchAction) -> RoleSet {
        BatchStatus::ALL
            .into_iter()
            .flat_map(|s| Self::outgoing(s).iter())
            .filter(|t| t.action == action)
            .fold(RoleSet::EMPTY, |acc, t| acc.union(t.allowed))
    }
}

/// What one actor may do with one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCapabilities {
    pub can_edit: bool,
    pub can_schedule_pickup: bool,
    pub can_receive: bool,
    pub actions: Vec<BatchAction>,
}

impl BatchCapabilities {
    pub fn resolve(status: BatchStatus, role: Role) -> Self {
        let actions: Vec<BatchAction> = BatchStateGraph::available(status, role)
            .into_iter()
            .map(|t| t.action)
            .collect();

        Self {
            can_edit: status.is_editable() && LOGISTICS.contains(role),
            can_schedule_pickup: actions.contains(&BatchAction::SchedulePickup),
            can_receive: actions.contains(&BatchAction::Receive),
            actions,
        }
    }
}
