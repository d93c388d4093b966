use supplygate_auth::Actor;

/// Identity context for a request.
///
/// Inserted by the identity middleware and immutable afterwards; every
/// workflow route requires it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: Actor,
}

impl ActorContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }
}
