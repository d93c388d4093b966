//! `supplygate-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{AggregateRoot, ExpectedStatus};
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{AuditEntryId, BatchId, RequisitionId, RequisitionItemId, UserId};
