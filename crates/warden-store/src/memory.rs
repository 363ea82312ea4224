//! In-memory implementation of `SessionStore`.
//!
//! `InMemorySessionStore` keeps every record in a `HashMap` behind a `Mutex`,
//! so it can be shared across the heartbeat tasks of many actors. Nothing
//! survives the process; use it for tests and short-lived hosts.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use warden_contracts::{actor::ActorId, error::WardenResult, session::SessionRecord};
use warden_core::traits::SessionStore;

#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    records: Mutex<HashMap<ActorId, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actors with a stored record.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A copy of every stored record.
    pub fn records(&self) -> Vec<SessionRecord> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ActorId, SessionRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, actor_id: &ActorId) -> WardenResult<Option<SessionRecord>> {
        Ok(self.lock().get(actor_id).cloned())
    }

    fn set(&self, actor_id: &ActorId, record: &SessionRecord) -> WardenResult<()> {
        self.lock().insert(*actor_id, record.clone());
        Ok(())
    }
}
