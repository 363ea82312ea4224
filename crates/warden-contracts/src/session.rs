//! Durable per-actor session bookkeeping.
//!
//! A `SessionRecord` outlives any single login. `first_login_at` is written
//! once, ever; `heartbeats` gains one entry per login session, keyed by that
//! session's start time in epoch seconds.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::ActorId;

/// When an actor first logged in, and the local timezone at that moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstLogin {
    pub timestamp: DateTime<Utc>,
    /// Local UTC offset label, e.g. `"+02:00"`.
    pub timezone: String,
}

/// Everything persisted about an actor's sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub actor_id: ActorId,
    pub first_login_at: FirstLogin,
    /// Session start (epoch seconds) → last time that session was seen alive.
    #[serde(default)]
    pub heartbeats: BTreeMap<i64, i64>,
}

impl SessionRecord {
    /// A record for an actor logging in for the first time.
    pub fn new(actor_id: ActorId, first_login_at: FirstLogin) -> Self {
        Self {
            actor_id,
            first_login_at,
            heartbeats: BTreeMap::new(),
        }
    }

    /// Set the last-seen time of the session started at `session_start`.
    ///
    /// The stored value never decreases, so a clock step backwards cannot
    /// rewind a session's liveness.
    pub fn record_heartbeat(&mut self, session_start: i64, seen_at: i64) {
        let entry = self.heartbeats.entry(session_start).or_insert(seen_at);
        if seen_at > *entry {
            *entry = seen_at;
        }
    }

    pub fn last_seen(&self, session_start: i64) -> Option<i64> {
        self.heartbeats.get(&session_start).copied()
    }

    /// The first session key at or after `start` not already taken by an
    /// earlier session.
    pub fn free_session_key(&self, start: i64) -> i64 {
        let mut key = start;
        while self.heartbeats.contains_key(&key) {
            key += 1;
        }
        key
    }

    /// Number of sessions ever recorded.
    pub fn session_count(&self) -> usize {
        self.heartbeats.len()
    }

    /// Total seconds between each session's start and its last heartbeat.
    pub fn total_seconds_online(&self) -> i64 {
        self.heartbeats
            .iter()
            .map(|(start, seen)| (seen - start).max(0))
            .sum()
    }
}
