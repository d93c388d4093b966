use serde::{Deserialize, Serialize};

use supplygate_auth::Role;
use supplygate_core::{RequisitionId, UserId};

/// Who should receive a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Recipient {
    /// Everyone holding the role.
    Role(Role),
    /// One explicit user, usually the requisition owner.
    User(UserId),
}

/// Type tag carried by every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    #[serde(rename = "requisition.submitted")]
    RequisitionSubmitted,
    #[serde(rename = "requisition.approved")]
    RequisitionApproved,
    #[serde(rename = "requisition.rejected")]
    RequisitionRejected,
    #[serde(rename = "requisition.ready-to-dispatch")]
    ReadyToDispatch,
    #[serde(rename = "batch.pickup-scheduled")]
    PickupScheduled,
    #[serde(rename = "requisition.delivered")]
    RequisitionDelivered,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::RequisitionSubmitted => "requisition.submitted",
            NotificationKind::RequisitionApproved => "requisition.approved",
            NotificationKind::RequisitionRejected => "requisition.rejected",
            NotificationKind::ReadyToDispatch => "requisition.ready-to-dispatch",
            NotificationKind::PickupScheduled => "batch.pickup-scheduled",
            NotificationKind::RequisitionDelivered => "requisition.delivered",
        }
    }
}

impl core::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification the workflow wants delivered. Transport is the sink's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub recipients: Vec<Recipient>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub requisition_id: RequisitionId,
}

impl NotificationRequest {
    pub fn new(
        kind: NotificationKind,
        requisition_id: RequisitionId,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipients: Vec::new(),
            kind,
            title: title.into(),
            message: message.into(),
            requisition_id,
        }
    }

    pub fn to_role(mut self, role: Role) -> Self {
        self.recipients.push(Recipient::Role(role));
        self
    }

    pub fn to_user(mut self, user_id: UserId) -> Self {
        self.recipients.push(Recipient::User(user_id));
        self
    }

    pub fn is_addressed_to_user(&self, user_id: UserId) -> bool {
        self.recipients.contains(&Recipient::User(user_id))
    }

    pub fn is_addressed_to_role(&self, role: Role) -> bool {
        self.recipients.contains(&Recipient::Role(role))
    }
}
