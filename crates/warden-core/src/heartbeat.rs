//! The session heartbeat tracker: one background task per login session.
//!
//! Lifecycle:
//!
//!   Starting → Running → Stopped
//!
//! - **Starting** completes before `HeartbeatTracker::start` resolves, on
//!   the blocking pool. It picks the session key, and creates the actor's `SessionRecord` (with
//!   its one-time `first_login_at`) if the actor has never logged in.
//! - **Running** writes `heartbeats[session_start] = now` immediately and
//!   then once per interval.
//! - **Stopped** is terminal. Cancellation is observed before every tick and
//!   while a write is in flight; no new tick starts after it.
//!
//! Store failures never stop the tracker: each tick is a full
//! read-modify-write, so a failed tick is simply repeated by the next one.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use warden_contracts::{
    actor::ActorId,
    error::{WardenError, WardenResult},
    session::{FirstLogin, SessionRecord},
};

use crate::{clock::Clock, traits::SessionStore};

/// Observable lifecycle state of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Starting,
    Running,
    Stopped,
}

/// Handle to a running heartbeat task.
///
/// Dropping the handle cancels the task, so a tracker can never outlive
/// whatever owns it. Cancellation is fire-and-forget: neither `stop()` nor
/// `drop` waits for the task to finish.
pub struct HeartbeatTracker {
    actor_id: ActorId,
    session_start: i64,
    cancel: CancellationToken,
    state: watch::Receiver<TrackerState>,
    _task: JoinHandle<()>,
}

impl HeartbeatTracker {
    /// Begin tracking a new session for `actor_id`.
    ///
    /// Must be awaited within a tokio runtime; returns
    /// `WardenError::ConfigError` otherwise. The login read and write run on
    /// the blocking pool, so the calling task is never stalled by store IO.
    pub async fn start(
        actor_id: ActorId,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        tick: Duration,
    ) -> WardenResult<Self> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            WardenError::ConfigError {
                reason: format!("heartbeat tracker requires a tokio runtime: {}", e),
            }
        })?;

        let (state_tx, state_rx) = watch::channel(TrackerState::Starting);
        let begin_store = Arc::clone(&store);
        let begin_clock = Arc::clone(&clock);
        let session_start = runtime
            .spawn_blocking(move || {
                begin_session(begin_store.as_ref(), begin_clock.as_ref(), &actor_id)
            })
            .await
            .map_err(|e| WardenError::StoreUnavailable {
                reason: format!("session start task failed: {}", e),
            })?;
        let cancel = CancellationToken::new();

        let task = runtime.spawn(run(
            actor_id,
            session_start,
            store,
            clock,
            tick.max(Duration::from_millis(1)),
            cancel.clone(),
            state_tx,
        ));

        info!(actor_id = %actor_id, session_start, "heartbeat tracker started");

        Ok(Self {
            actor_id,
            session_start,
            cancel,
            state: state_rx,
            _task: task,
        })
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    /// Key of this session in the record's `heartbeats` map.
    pub fn session_start(&self) -> i64 {
        self.session_start
    }

    pub fn state(&self) -> TrackerState {
        *self.state.borrow()
    }

    /// A receiver that follows this tracker's state transitions.
    pub fn watch_state(&self) -> watch::Receiver<TrackerState> {
        self.state.clone()
    }

    /// Signal the task to stop. Returns immediately.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for HeartbeatTracker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Starting ─────────────────────────────────────────────────────────────────

/// Resolve the session key and make sure the actor's record exists.
///
/// A store failure here is logged and tolerated; the first tick retries the
/// record creation.
fn begin_session(store: &dyn SessionStore, clock: &dyn Clock, actor_id: &ActorId) -> i64 {
    let now = clock.now();
    let requested = now.timestamp();

    match store.get(actor_id) {
        Ok(Some(record)) => {
            let key = record.free_session_key(requested);
            if key != requested {
                debug!(
                    actor_id = %actor_id,
                    requested,
                    key,
                    "session start collides with an earlier session; shifted key"
                );
            }
            key
        }
        Ok(None) => {
            let record = SessionRecord::new(
                *actor_id,
                FirstLogin {
                    timestamp: now,
                    timezone: clock.timezone_label(),
                },
            );
            if let Err(e) = store.set(actor_id, &record) {
                warn!(actor_id = %actor_id, error = %e, "could not create session record; will retry on next tick");
            } else {
                info!(actor_id = %actor_id, "first login recorded");
            }
            requested
        }
        Err(e) => {
            warn!(actor_id = %actor_id, error = %e, "could not read session record at login");
            requested
        }
    }
}

// ── Running ──────────────────────────────────────────────────────────────────

async fn run(
    actor_id: ActorId,
    session_start: i64,
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    tick: Duration,
    cancel: CancellationToken,
    state: watch::Sender<TrackerState>,
) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    state.send_replace(TrackerState::Running);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let tick_store = Arc::clone(&store);
        let tick_clock = Arc::clone(&clock);
        let write = tokio::task::spawn_blocking(move || {
            beat(tick_store.as_ref(), tick_clock.as_ref(), &actor_id, session_start)
        });

        // The in-flight write may still land after cancellation, but the
        // loop does not wait for it.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = write => match outcome {
                Ok(Ok(seen_at)) => {
                    debug!(actor_id = %actor_id, session_start, seen_at, "heartbeat written");
                }
                Ok(Err(e)) => {
                    warn!(actor_id = %actor_id, session_start, error = %e, "heartbeat write failed; retrying next tick");
                }
                Err(e) => {
                    warn!(actor_id = %actor_id, session_start, error = %e, "heartbeat write task failed; retrying next tick");
                }
            },
        }
    }

    state.send_replace(TrackerState::Stopped);
    info!(actor_id = %actor_id, session_start, "heartbeat tracker stopped");
}

/// One read-modify-write of the actor's record. Returns the written
/// last-seen time.
fn beat(
    store: &dyn SessionStore,
    clock: &dyn Clock,
    actor_id: &ActorId,
    session_start: i64,
) -> WardenResult<i64> {
    let now = clock.now();
    let mut record = match store.get(actor_id)? {
        Some(record) => record,
        None => SessionRecord::new(
            *actor_id,
            FirstLogin {
                timestamp: now,
                timezone: clock.timezone_label(),
            },
        ),
    };
    record.record_heartbeat(session_start, now.timestamp());
    store.set(actor_id, &record)?;
    Ok(now.timestamp())
}
