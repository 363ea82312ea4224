//! Fixed name → id lookup.

use std::collections::HashMap;

use warden_contracts::actor::ActorId;
use warden_core::traits::IdentityResolver;

/// An `IdentityResolver` over a table the host fills in, e.g. from the
/// server's user cache. Names are matched exactly.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    names: HashMap<String, ActorId>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `name` to `actor_id`, replacing any earlier mapping.
    pub fn insert(&mut self, name: impl Into<String>, actor_id: ActorId) {
        self.names.insert(name.into(), actor_id);
    }

    pub fn with(mut self, name: impl Into<String>, actor_id: ActorId) -> Self {
        self.insert(name, actor_id);
        self
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl IdentityResolver for StaticIdentityResolver {
    fn resolve(&self, name: &str) -> Option<ActorId> {
        self.names.get(name).copied()
    }
}
