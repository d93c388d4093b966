//! Requisition domain module (approval workflow).
//!
//! This crate contains the requisition lifecycle rules, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod graph;
pub mod history;
pub mod permissions;
pub mod requisition;
pub mod status;

pub use graph::{Action, EdgeError, MIN_COMMENT_CHARS, PROCESS_TARGETS, StateGraph, Transition};
pub use history::{AuditTrail, StatusHistoryEntry};
pub use permissions::{BATCH_ELIGIBLE, Capabilities, DISPATCHERS, PermissionResolver};
pub use requisition::{Requisition, RequisitionItem};
pub use status::RequisitionStatus;
