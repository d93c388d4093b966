//! Workflow infrastructure: persistence boundary and the orchestrating engine.

pub mod engine;
pub mod error;
pub mod store;

pub use engine::{NewBatch, WorkflowEngine};
pub use error::{WorkflowError, WorkflowResult};
pub use store::{
    BatchWrite, Changeset, InMemoryWorkflowStore, RequisitionWrite, StoreError, WorkflowStore,
};
