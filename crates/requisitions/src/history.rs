//! Append-only audit trail of a requisition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supplygate_auth::{Actor, Role};
use supplygate_core::{AuditEntryId, DomainError, DomainResult, RequisitionId, UserId};

use crate::RequisitionStatus;

/// One immutable audit record: a status change, or a comment pinned to the
/// status it was written against (`previous_status == new_status`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: AuditEntryId,
    pub requisition_id: RequisitionId,
    pub previous_status: RequisitionStatus,
    pub new_status: RequisitionStatus,
    pub actor_id: UserId,
    pub actor_role: Role,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    pub fn transition(
        requisition_id: RequisitionId,
        previous_status: RequisitionStatus,
        new_status: RequisitionStatus,
        actor: &Actor,
        comment: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            requisition_id,
            previous_status,
            new_status,
            actor_id: actor.user_id(),
            actor_role: actor.role(),
            comment: comment.filter(|c| !c.trim().is_empty()),
            created_at,
        }
    }

    pub fn comment_only(
        requisition_id: RequisitionId,
        status: RequisitionStatus,
        actor: &Actor,
        comment: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            requisition_id,
            previous_status: status,
            new_status: status,
            actor_id: actor.user_id(),
            actor_role: actor.role(),
            comment: Some(comment.into()),
            created_at,
        }
    }

    pub fn is_comment_only(&self) -> bool {
        self.previous_status == self.new_status
    }
}

/// The ordered audit trail of one requisition.
///
/// Entries are kept in append order (timestamp, then time-ordered id). The
/// trail is read-only: it is reconstructed from storage, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    requisition_id: RequisitionId,
    entries: Vec<StatusHistoryEntry>,
}

impl AuditTrail {
    pub fn from_entries(
        requisition_id: RequisitionId,
        mut entries: Vec<StatusHistoryEntry>,
    ) -> DomainResult<Self> {
        if let Some(foreign) = entries.iter().find(|e| e.requisition_id != requisition_id) {
            return Err(DomainError::validation(format!(
                "audit entry {} belongs to requisition {}",
                foreign.id, foreign.requisition_id
            )));
        }
        entries.sort_by_key(|e| (e.created_at, e.id));
        Ok(Self {
            requisition_id,
            entries,
        })
    }

    pub fn requisition_id(&self) -> RequisitionId {
        self.requisition_id
    }

    pub fn entries(&self) -> &[StatusHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status_changes(&self) -> impl Iterator<Item = &StatusHistoryEntry> {
        self.entries.iter().filter(|e| !e.is_comment_only())
    }

    pub fn comments(&self) -> impl Iterator<Item = &StatusHistoryEntry> {
        self.entries.iter().filter(|e| e.comment.is_some())
    }

    /// Status implied by the trail, starting from `initial`.
    pub fn current_status(&self, initial: RequisitionStatus) -> RequisitionStatus {
        self.status_changes().last().map(|e| e.new_status).unwrap_or(initial)
    }

    /// Check that every entry starts from the status the previous one left.
    ///
    /// A gap means a status change was committed without its audit entry (or
    /// the other way round).
    pub fn verify_chain(&self, initial: RequisitionStatus) -> DomainResult<()> {
        let mut current = initial;
        for entry in &self.entries {
            if entry.previous_status != current {
                return Err(DomainError::conflict(format!(
                    "audit entry {} starts from '{}' but the trail is at '{}'",
                    entry.id, entry.previous_status, current
                )));
            }
            current = entry.new_status;
        }
        Ok(())
    }
}
