use thiserror::Error;

use supplygate_auth::AuthzError;
use supplygate_core::{DomainError, ErrorKind};
use supplygate_requisitions::EdgeError;

use crate::store::StoreError;

/// Failure of one workflow action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Domain(e) => e.kind(),
            WorkflowError::Store(StoreError::Conflict(_)) => ErrorKind::Conflict,
            WorkflowError::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            WorkflowError::Store(StoreError::Integrity(_) | StoreError::Unavailable(_)) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the failure came from below the domain (and was not a plain
    /// precondition mismatch).
    pub fn is_internal(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}

impl From<AuthzError> for WorkflowError {
    fn from(value: AuthzError) -> Self {
        WorkflowError::Domain(value.into())
    }
}

impl From<EdgeError> for WorkflowError {
    fn from(value: EdgeError) -> Self {
        WorkflowError::Domain(value.into())
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
