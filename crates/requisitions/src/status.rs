use core::str::FromStr;

use serde::{Deserialize, Serialize};

use supplygate_core::DomainError;

/// Requisition status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequisitionStatus {
    Draft,
    SecurityReview,
    ManagementReview,
    RejectedBySecurity,
    RejectedByManagement,
    LogisticsReview,
    Purchasing,
    RejectedByAdministration,
    ReadyToDispatch,
    Shipped,
    PartiallyDelivered,
    FullyDelivered,
}

impl RequisitionStatus {
    pub const ALL: [RequisitionStatus; 12] = [
        RequisitionStatus::Draft,
        RequisitionStatus::SecurityReview,
        RequisitionStatus::ManagementReview,
        RequisitionStatus::RejectedBySecurity,
        RequisitionStatus::RejectedByManagement,
        RequisitionStatus::LogisticsReview,
        RequisitionStatus::Purchasing,
        RequisitionStatus::RejectedByAdministration,
        RequisitionStatus::ReadyToDispatch,
        RequisitionStatus::Shipped,
        RequisitionStatus::PartiallyDelivered,
        RequisitionStatus::FullyDelivered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequisitionStatus::Draft => "draft",
            RequisitionStatus::SecurityReview => "security-review",
            RequisitionStatus::ManagementReview => "management-review",
            RequisitionStatus::RejectedBySecurity => "rejected-by-security",
            RequisitionStatus::RejectedByManagement => "rejected-by-management",
            RequisitionStatus::LogisticsReview => "logistics-review",
            RequisitionStatus::Purchasing => "purchasing",
            RequisitionStatus::RejectedByAdministration => "rejected-by-administration",
            RequisitionStatus::ReadyToDispatch => "ready-to-dispatch",
            RequisitionStatus::Shipped => "shipped",
            RequisitionStatus::PartiallyDelivered => "partially-delivered",
            RequisitionStatus::FullyDelivered => "fully-delivered",
        }
    }

    pub fn is_rejected(self) -> bool {
        matches!(
            self,
            RequisitionStatus::RejectedBySecurity
                | RequisitionStatus::RejectedByManagement
                | RequisitionStatus::RejectedByAdministration
        )
    }
}

impl core::fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequisitionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        RequisitionStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown requisition status '{s}'")))
    }
}
