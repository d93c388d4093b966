use core::str::FromStr;

use serde::{Deserialize, Serialize};

use supplygate_core::DomainError;

/// Shipment batch status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchStatus {
    Pending,
    Preparing,
    Dispatched,
    InTransit,
    PendingReceipt,
    Received,
}

impl BatchStatus {
    pub const ALL: [BatchStatus; 6] = [
        BatchStatus::Pending,
        BatchStatus::Preparing,
        BatchStatus::Dispatched,
        BatchStatus::InTransit,
        BatchStatus::PendingReceipt,
        BatchStatus::Received,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Preparing => "preparing",
            BatchStatus::Dispatched => "dispatched",
            BatchStatus::InTransit => "in-transit",
            BatchStatus::PendingReceipt => "pending-receipt",
            BatchStatus::Received => "received",
        }
    }

    /// Carrier, destination, notes and status may only be patched before dispatch.
    pub fn is_editable(self) -> bool {
        matches!(self, BatchStatus::Pending | BatchStatus::Preparing)
    }

    /// Goods in this batch count towards the parent's delivered quantities.
    pub fn is_delivered(self) -> bool {
        self == BatchStatus::Received
    }
}

impl core::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        BatchStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown batch status '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pre_dispatch_statuses_are_editable() {
        let editable: Vec<_> = BatchStatus::ALL.into_iter().filter(|s| s.is_editable()).collect();
        assert_eq!(editable, vec![BatchStatus::Pending, BatchStatus::Preparing]);
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("in-transit".parse::<BatchStatus>().unwrap(), BatchStatus::InTransit);
        assert_eq!("PENDING_RECEIPT".parse::<BatchStatus>().unwrap(), BatchStatus::PendingReceipt);
        assert_eq!(serde_json::to_string(&BatchStatus::InTransit).unwrap(), "\"in-transit\"");
    }
}
