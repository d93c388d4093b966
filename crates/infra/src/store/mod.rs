//! Workflow persistence boundary.
//!
//! The engine reads aggregates and writes one [`Changeset`] per action. A
//! changeset is applied atomically: every status precondition in it is checked
//! before any part of it is written.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryWorkflowStore;
pub use r#trait::{BatchWrite, Changeset, RequisitionWrite, StoreError, WorkflowStore};
