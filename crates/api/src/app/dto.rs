use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use supplygate_core::RequisitionItemId;
use supplygate_requisitions::RequisitionStatus;
use supplygate_shipments::BatchAction;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveRequest {
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    pub comment: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub target_status: RequisitionStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedQuantity {
    pub item_id: RequisitionItemId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedQuantitiesRequest {
    pub items: Vec<ApprovedQuantity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceBatchRequest {
    pub action: BatchAction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePickupRequest {
    pub estimated_date: NaiveDate,
    pub note: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmIResponse {
    pub user_id: String,
    pub role: String,
}
