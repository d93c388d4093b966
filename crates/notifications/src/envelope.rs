use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::NotificationRequest;

/// Outbox row for a notification.
///
/// This is the unit persisted alongside the status change that caused it, so
/// a notification exists if and only if its transition was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEnvelope {
    id: Uuid,
    requested_at: DateTime<Utc>,
    request: NotificationRequest,
}

impl NotificationEnvelope {
    pub fn new(request: NotificationRequest, requested_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            requested_at,
            request,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn request(&self) -> &NotificationRequest {
        &self.request
    }

    pub fn into_request(self) -> NotificationRequest {
        self.request
    }
}
