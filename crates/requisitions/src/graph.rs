//! Requisition state graph.
//!
//! The table is `static` data indexed by source status through an exhaustive
//! `match`, so adding a status without deciding its outgoing edges is a
//! compile error rather than a silently dead state.

use serde::{Deserialize, Serialize};

use supplygate_auth::{Role, RoleSet};
use supplygate_core::DomainError;

use crate::RequisitionStatus;
use crate::RequisitionStatus as S;

/// Minimum trimmed length of a rejection reason.
pub const MIN_COMMENT_CHARS: usize = 10;

/// Workflow verbs a caller can request on a requisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Submit,
    Approve,
    Reject,
    Process,
    Dispatch,
    Deliver,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Submit,
        Action::Approve,
        Action::Reject,
        Action::Process,
        Action::Dispatch,
        Action::Deliver,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Submit => "submit",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Process => "process",
            Action::Dispatch => "dispatch",
            Action::Deliver => "deliver",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One legal edge of the requisition lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: RequisitionStatus,
    pub to: RequisitionStatus,
    pub action: Action,
    pub allowed: RoleSet,
    pub requires_comment: bool,
}

impl Transition {
    pub fn permits(&self, role: Role) -> bool {
        self.allowed.contains(role)
    }
}

const fn edge(from: S, to: S, action: Action, allowed: RoleSet) -> Transition {
    Transition {
        from,
        to,
        action,
        allowed,
        requires_comment: false,
    }
}

const fn commented(t: Transition) -> Transition {
    Transition {
        requires_comment: true,
        ..t
    }
}

const SUBMITTERS: RoleSet = RoleSet::admins_and(Role::Requester);
const SECURITY: RoleSet = RoleSet::admins_and(Role::Security);
const MANAGEMENT: RoleSet = RoleSet::admins_and(Role::Management);
const LOGISTICS: RoleSet = RoleSet::admins_and(Role::Logistics);
const ADMINISTRATION: RoleSet = RoleSet::admins_and(Role::Administration);
const RECEIVERS: RoleSet = RoleSet::admins_and(Role::Receiver).with(Role::Logistics);

static FROM_DRAFT: [Transition; 1] = [edge(S::Draft, S::SecurityReview, Action::Submit, SUBMITTERS)];

static FROM_SECURITY_REVIEW: [Transition; 2] = [
    edge(S::SecurityReview, S::ManagementReview, Action::Approve, SECURITY),
    commented(edge(S::SecurityReview, S::RejectedBySecurity, Action::Reject, SECURITY)),
];

static FROM_MANAGEMENT_REVIEW: [Transition; 2] = [
    edge(S::ManagementReview, S::LogisticsReview, Action::Approve, MANAGEMENT),
    commented(edge(S::ManagementReview, S::RejectedByManagement, Action::Reject, MANAGEMENT)),
];

static FROM_LOGISTICS_REVIEW: [Transition; 2] = [
    edge(S::LogisticsReview, S::Purchasing, Action::Process, LOGISTICS),
    edge(S::LogisticsReview, S::ReadyToDispatch, Action::Process, LOGISTICS),
];

static FROM_PURCHASING: [Transition; 2] = [
    edge(S::Purchasing, S::ReadyToDispatch, Action::Approve, ADMINISTRATION),
    commented(edge(S::Purchasing, S::RejectedByAdministration, Action::Reject, ADMINISTRATION)),
];

static FROM_READY_TO_DISPATCH: [Transition; 1] =
    [edge(S::ReadyToDispatch, S::Shipped, Action::Dispatch, LOGISTICS)];

static FROM_SHIPPED: [Transition; 2] = [
    edge(S::Shipped, S::PartiallyDelivered, Action::Deliver, RECEIVERS),
    edge(S::Shipped, S::FullyDelivered, Action::Deliver, RECEIVERS),
];

static FROM_PARTIALLY_DELIVERED: [Transition; 1] =
    [edge(S::PartiallyDelivered, S::FullyDelivered, Action::Deliver, RECEIVERS)];

/// Downstream statuses the coarse `process` action may target.
pub const PROCESS_TARGETS: [RequisitionStatus; 5] = [
    S::Purchasing,
    S::ReadyToDispatch,
    S::Shipped,
    S::PartiallyDelivered,
    S::FullyDelivered,
];

/// Why a requested edge could not be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeError {
    /// No role may perform `action` from `from`.
    NoEdge { from: RequisitionStatus, action: Action },
    /// The edge exists but `role` is not among its allowed roles.
    RoleNotAllowed {
        from: RequisitionStatus,
        action: Action,
        role: Role,
    },
}

impl From<EdgeError> for DomainError {
    fn from(value: EdgeError) -> Self {
        match value {
            EdgeError::NoEdge { from, action } => DomainError::invalid_transition(format!(
                "cannot {action} a requisition in status '{from}'"
            )),
            EdgeError::RoleNotAllowed { from, action, role } => DomainError::forbidden(format!(
                "role '{role}' may not {action} a requisition in status '{from}'"
            )),
        }
    }
}

/// Pure lookups over the requisition transition table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateGraph;

impl StateGraph {
    /// Every edge leaving `from`, regardless of role.
    pub fn outgoing(from: RequisitionStatus) -> &'static [Transition] {
        match from {
            S::Draft => &FROM_DRAFT,
            S::SecurityReview => &FROM_SECURITY_REVIEW,
            S::ManagementReview => &FROM_MANAGEMENT_REVIEW,
            S::LogisticsReview => &FROM_LOGISTICS_REVIEW,
            S::Purchasing => &FROM_PURCHASING,
            S::ReadyToDispatch => &FROM_READY_TO_DISPATCH,
            S::Shipped => &FROM_SHIPPED,
            S::PartiallyDelivered => &FROM_PARTIALLY_DELIVERED,
            S::RejectedBySecurity
            | S::RejectedByManagement
            | S::RejectedByAdministration
            | S::FullyDelivered => &[],
        }
    }

    /// Edges leaving `from` for a given action, regardless of role.
    pub fn edges(from: RequisitionStatus, action: Action) -> impl Iterator<Item = &'static Transition> {
        Self::outgoing(from).iter().filter(move |t| t.action == action)
    }

    pub fn available_transitions(state: RequisitionStatus, role: Role) -> Vec<Transition> {
        Self::outgoing(state)
            .iter()
            .filter(|t| t.permits(role))
            .copied()
            .collect()
    }

    pub fn can_transition(
        from: RequisitionStatus,
        to: RequisitionStatus,
        role: Role,
    ) -> Option<Transition> {
        Self::outgoing(from)
            .iter()
            .find(|t| t.to == to && t.permits(role))
            .copied()
    }

    /// Destination of `action` from `from` for `role`.
    ///
    /// For the multi-destination `deliver` edges this is the first declared
    /// destination; the real one is decided by batch reconciliation.
    pub fn next_status(
        from: RequisitionStatus,
        action: Action,
        role: Role,
    ) -> Option<RequisitionStatus> {
        Self::edges(from, action).find(|t| t.permits(role)).map(|t| t.to)
    }

    /// Like [`StateGraph::next_status`], but says whether the edge is missing
    /// altogether or only closed to this role.
    pub fn resolve(
        from: RequisitionStatus,
        action: Action,
        role: Role,
    ) -> Result<Transition, EdgeError> {
        let mut any = false;
        for t in Self::edges(from, action) {
            any = true;
            if t.permits(role) {
                return Ok(*t);
            }
        }
        if any {
            Err(EdgeError::RoleNotAllowed { from, action, role })
        } else {
            Err(EdgeError::NoEdge { from, action })
        }
    }

    pub fn is_terminal(state: RequisitionStatus) -> bool {
        state.is_rejected() || state == S::FullyDelivered
    }

    pub fn is_pending_approval(state: RequisitionStatus) -> bool {
        matches!(state, S::SecurityReview | S::ManagementReview | S::Purchasing)
    }

    /// Fixed mapping from a review gate to its rejected terminal.
    pub fn rejection_target(from: RequisitionStatus) -> Option<RequisitionStatus> {
        match from {
            S::SecurityReview => Some(S::RejectedBySecurity),
            S::ManagementReview => Some(S::RejectedByManagement),
            S::Purchasing => Some(S::RejectedByAdministration),
            _ => None,
        }
    }

    /// Narrow map used by the coarse `process` action (post logistics review).
    pub fn process_targets(from: RequisitionStatus) -> &'static [RequisitionStatus] {
        match from {
            S::LogisticsReview => &[S::Purchasing, S::ReadyToDispatch],
            S::Purchasing => &[S::ReadyToDispatch],
            S::ReadyToDispatch => &[S::Shipped],
            S::Shipped => &[S::PartiallyDelivered, S::FullyDelivered],
            S::PartiallyDelivered => &[S::FullyDelivered],
            _ => &[],
        }
    }

    /// Roles allowed to drive `process` into `target`.
    ///
    /// Administration may only release purchased goods to dispatch.
    pub fn process_roles(target: RequisitionStatus) -> RoleSet {
        if target == S::ReadyToDispatch {
            LOGISTICS.with(Role::Administration)
        } else {
            LOGISTICS
        }
    }
}
