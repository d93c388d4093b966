//! `supplygate-auth`: pure authorization boundary for workflow actors.
//!
//! No HTTP and no storage here: it never authenticates, it only describes
//! who is acting and in which role.

pub mod actor;
pub mod authorize;
pub mod roles;

pub use actor::Actor;
pub use authorize::{authorize, AuthzError};
pub use roles::{Role, RoleSet};
