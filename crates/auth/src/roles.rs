use core::str::FromStr;

use serde::{Deserialize, Serialize};

use supplygate_core::DomainError;

/// Role identifier used for workflow RBAC.
///
/// The set is closed: every transition table row names its roles from here.
/// `Admin` and `Superadmin` are the two administrative roles; any table row
/// granted to "admin" is granted to both.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Requester,
    Security,
    Management,
    Logistics,
    Administration,
    Receiver,
    Admin,
    Superadmin,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Requester,
        Role::Security,
        Role::Management,
        Role::Logistics,
        Role::Administration,
        Role::Receiver,
        Role::Admin,
        Role::Superadmin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Requester => "requester",
            Role::Security => "security",
            Role::Management => "management",
            Role::Logistics => "logistics",
            Role::Administration => "administration",
            Role::Receiver => "receiver",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }

    /// Staff roles can see every requisition; requesters only see their own.
    pub fn is_staff(self) -> bool {
        self != Role::Requester
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| DomainError::validation(format!("unknown role '{s}'")))
    }
}

/// Compact, const-constructible set of roles.
///
/// Transition tables are `static` data, so membership is a bit test rather
/// than a slice scan.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u16);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);

    /// Both administrative roles.
    pub const ADMINS: RoleSet = RoleSet(Role::Admin.bit() | Role::Superadmin.bit());

    pub const fn with(self, role: Role) -> Self {
        Self(self.0 | role.bit())
    }

    /// `role` plus both administrative roles.
    pub const fn admins_and(role: Role) -> Self {
        Self::ADMINS.with(role)
    }

    pub const fn union(self, other: RoleSet) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(RoleSet::EMPTY, RoleSet::with)
    }
}

impl core::fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl core::fmt::Display for RoleSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let names: Vec<&str> = self.iter().map(Role::as_str).collect();
        f.write_str(&names.join(", "))
    }
}
