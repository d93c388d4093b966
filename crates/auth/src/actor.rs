use serde::{Deserialize, Serialize};

use supplygate_core::UserId;

use crate::Role;

/// An already-authenticated identity driving a workflow action.
///
/// Construction is decoupled from how identity was proven: transports build
/// this from whatever their authentication layer hands them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    user_id: UserId,
    role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this actor is the given owner.
    pub fn is(&self, owner: UserId) -> bool {
        self.user_id == owner
    }
}
