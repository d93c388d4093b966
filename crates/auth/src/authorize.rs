use thiserror::Error;

use supplygate_core::DomainError;

use crate::{Actor, Role, RoleSet};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("role '{role}' may not {action} (allowed: {allowed})")]
    RoleNotAllowed {
        role: Role,
        action: &'static str,
        allowed: RoleSet,
    },
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::forbidden(value.to_string())
    }
}

/// Authorize an actor by role membership.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(actor: &Actor, allowed: RoleSet, action: &'static str) -> Result<(), AuthzError> {
    if allowed.contains(actor.role()) {
        Ok(())
    } else {
        Err(AuthzError::RoleNotAllowed {
            role: actor.role(),
            action,
            allowed,
        })
    }
}
