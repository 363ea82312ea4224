//! Registry of live heartbeat trackers, keyed by actor id.
//!
//! Teardown paths look trackers up here to cancel them deterministically.
//! At most one tracker runs per actor: starting a new session for an actor
//! that is already tracked cancels the previous one first.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::sync::watch;
use tracing::{debug, info};

use warden_contracts::{actor::ActorId, error::WardenResult};

use crate::{
    clock::Clock,
    config::HeartbeatConfig,
    heartbeat::{HeartbeatTracker, TrackerState},
    traits::SessionStore,
};

pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    tick: Duration,
    trackers: Mutex<HashMap<ActorId, HeartbeatTracker>>,
}

impl SessionRegistry {
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: &HeartbeatConfig,
    ) -> Self {
        Self {
            store,
            clock,
            tick: config.interval(),
            trackers: Mutex::new(HashMap::new()),
        }
    }

    /// The store every tracker in this registry writes to.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Start tracking a new session and return its session start key.
    pub async fn start(&self, actor_id: ActorId) -> WardenResult<i64> {
        let previous = self.lock().remove(&actor_id);
        if let Some(previous) = previous {
            debug!(
                actor_id = %actor_id,
                session_start = previous.session_start(),
                "replacing existing session tracker"
            );
            previous.stop();
        }

        let tracker = HeartbeatTracker::start(
            actor_id,
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.tick,
        )
        .await?;
        let session_start = tracker.session_start();
        self.lock().insert(actor_id, tracker);
        Ok(session_start)
    }

    /// Cancel the actor's tracker, whatever session it belongs to.
    pub fn stop(&self, actor_id: &ActorId) -> bool {
        match self.lock().remove(actor_id) {
            Some(tracker) => {
                tracker.stop();
                true
            }
            None => false,
        }
    }

    /// Cancel the actor's tracker only if it is still tracking the session
    /// started at `session_start`.
    ///
    /// Lets a stale context tear down without killing a newer session of the
    /// same actor.
    pub fn stop_session(&self, actor_id: &ActorId, session_start: i64) -> bool {
        let mut trackers = self.lock();
        let current = trackers
            .get(actor_id)
            .map(|t| t.session_start() == session_start)
            .unwrap_or(false);
        if !current {
            return false;
        }
        if let Some(tracker) = trackers.remove(actor_id) {
            tracker.stop();
        }
        true
    }

    pub fn is_tracking(&self, actor_id: &ActorId) -> bool {
        self.lock().contains_key(actor_id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Follow the state of the actor's current tracker.
    pub fn watch_state(&self, actor_id: &ActorId) -> Option<watch::Receiver<TrackerState>> {
        self.lock().get(actor_id).map(|t| t.watch_state())
    }

    /// Cancel every tracker. Returns how many were running.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<HeartbeatTracker> = self.lock().drain().map(|(_, t)| t).collect();
        for tracker in &drained {
            tracker.stop();
        }
        if !drained.is_empty() {
            info!(count = drained.len(), "session registry shut down");
        }
        drained.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ActorId, HeartbeatTracker>> {
        self.trackers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
