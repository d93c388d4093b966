//! Aggregate root trait for status-driven workflow models.

use crate::error::{DomainError, DomainResult};

/// Aggregate root marker + minimal interface.
///
/// Workflow aggregates are identified by id and carry a single closed-enum
/// status that only moves along a declared state graph.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Closed status enumeration of the aggregate's lifecycle.
    type Status: Copy + Eq + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Current lifecycle status.
    fn status(&self) -> Self::Status;
}

/// Optimistic precondition on an aggregate's status.
///
/// A write carries the status observed at guard-check time; storage applies it
/// only if the stored status still matches (compare-and-swap).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ExpectedStatus<S>(S);

impl<S> ExpectedStatus<S>
where
    S: Copy + Eq + core::fmt::Debug,
{
    pub fn new(status: S) -> Self {
        Self(status)
    }

    /// Capture the status of an aggregate as it was just read.
    pub fn of<A>(aggregate: &A) -> Self
    where
        A: AggregateRoot<Status = S>,
    {
        Self(aggregate.status())
    }

    pub fn status(self) -> S {
        self.0
    }

    pub fn matches(self, actual: S) -> bool {
        self.0 == actual
    }

    pub fn check(self, actual: S) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "status changed concurrently (expected: {:?}, actual: {actual:?})",
                self.0
            )))
        }
    }
}
