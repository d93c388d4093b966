//! Shipment batch domain module.
//!
//! Batches are partial physical dispatches of a requisition's approved items.
//! Their nested lifecycle feeds the parent's delivery status through
//! [`BatchReconciler`]. Pure domain logic (no IO, no storage).

pub mod batch;
pub mod graph;
pub mod reconcile;
pub mod status;

pub use batch::{BatchDetails, BatchLineItem, BatchPatch, ShipmentBatch};
pub use graph::{BatchAction, BatchCapabilities, BatchStateGraph, BatchTransition, MIN_PICKUP_NOTE_CHARS};
pub use reconcile::BatchReconciler;
pub use status::BatchStatus;
