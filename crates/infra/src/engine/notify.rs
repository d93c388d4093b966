//! Notification requests raised by workflow actions.

use chrono::NaiveDate;

use supplygate_auth::Role;
use supplygate_notifications::{NotificationKind, NotificationRequest};
use supplygate_requisitions::{Requisition, RequisitionStatus};
use supplygate_shipments::ShipmentBatch;

pub(super) fn submitted(requisition: &Requisition) -> NotificationRequest {
    NotificationRequest::new(
        NotificationKind::RequisitionSubmitted,
        requisition.id_typed(),
        "Requisition awaiting security review",
        format!(
            "Requisition {} was submitted with {} item(s).",
            requisition.id_typed(),
            requisition.active_item_count()
        ),
    )
    .to_role(Role::Security)
}

/// Whoever gates the status the requisition was just approved into.
pub(super) fn approved(requisition: &Requisition, to: RequisitionStatus) -> Option<NotificationRequest> {
    let id = requisition.id_typed();
    let queue = |role: Role, title: &str| {
        NotificationRequest::new(
            NotificationKind::RequisitionApproved,
            id,
            title,
            format!("Requisition {id} moved to '{to}'."),
        )
        .to_role(role)
    };

    match to {
        RequisitionStatus::ManagementReview => {
            Some(queue(Role::Management, "Requisition awaiting management review"))
        }
        RequisitionStatus::LogisticsReview => {
            Some(queue(Role::Logistics, "Requisition awaiting logistics review"))
        }
        RequisitionStatus::ReadyToDispatch => Some(
            NotificationRequest::new(
                NotificationKind::ReadyToDispatch,
                id,
                "Requisition ready to dispatch",
                format!("Requisition {id} was released for dispatch."),
            )
            .to_role(Role::Logistics)
            .to_user(requisition.requester_id()),
        ),
        _ => None,
    }
}

/// The owner gets the reason verbatim.
pub(super) fn rejected(requisition: &Requisition, to: RequisitionStatus, reason: &str) -> NotificationRequest {
    NotificationRequest::new(
        NotificationKind::RequisitionRejected,
        requisition.id_typed(),
        format!("Requisition {} is now '{to}'", requisition.id_typed()),
        reason,
    )
    .to_user(requisition.requester_id())
}

pub(super) fn pickup_scheduled(batch: &ShipmentBatch, date: NaiveDate, note: &str) -> NotificationRequest {
    NotificationRequest::new(
        NotificationKind::PickupScheduled,
        batch.requisition_id(),
        format!("Pickup scheduled for batch #{}", batch.batch_number()),
        format!("Estimated pickup on {date}: {note}"),
    )
    .to_role(Role::Logistics)
}

pub(super) fn fully_delivered(requisition: &Requisition) -> NotificationRequest {
    NotificationRequest::new(
        NotificationKind::RequisitionDelivered,
        requisition.id_typed(),
        "Requisition fully delivered",
        format!("Every approved item of requisition {} has been received.", requisition.id_typed()),
    )
    .to_user(requisition.requester_id())
}
