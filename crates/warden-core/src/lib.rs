//! # warden-core
//!
//! Per-actor runtime for the warden permission and session layer.
//!
//! This crate provides:
//! - The collaborator traits (`PermissionEngine`, `SessionStore`, `IdentityResolver`)
//! - The `HeartbeatTracker` that persists session liveness in the background
//! - The `SessionRegistry` that owns one tracker per logged-in actor
//! - The `ActorContext` that wires a login to both
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_core::{ActorContext, SessionRegistry, clock::SystemClock};
//!
//! let sessions = Arc::new(SessionRegistry::new(store, Arc::new(SystemClock), &config.heartbeat));
//! let ctx = ActorContext::login(actor, engine, sessions).await?;
//! if ctx.has_permission(Some("area.edit")) { /* ... */ }
//! ctx.logout();
//! ```

pub mod actor;
pub mod clock;
pub mod config;
pub mod heartbeat;
pub mod registry;
pub mod traits;

pub use actor::ActorContext;
pub use config::WardenConfig;
pub use heartbeat::{HeartbeatTracker, TrackerState};
pub use registry::SessionRegistry;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        future::Future,
        sync::{
            atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
            Arc, Mutex,
        },
        task::{Context, Poll, Waker},
        time::Duration,
    };

    use warden_contracts::{
        actor::{Actor, ActorId},
        error::{WardenError, WardenResult},
        session::SessionRecord,
    };

    use crate::{
        clock::{Clock, ManualClock},
        config::{HeartbeatConfig, WardenConfig},
        heartbeat::{HeartbeatTracker, TrackerState},
        registry::SessionRegistry,
        traits::{IdentityResolver, PermissionEngine, SessionStore},
        ActorContext,
    };

    const TICK: Duration = Duration::from_millis(20);

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// In-memory store that counts successful writes and can be told to fail.
    #[derive(Default)]
    struct RecordingStore {
        records: Mutex<HashMap<ActorId, SessionRecord>>,
        writes: AtomicUsize,
        failing: AtomicBool,
        read_delay_ms: AtomicU64,
    }

    impl RecordingStore {
        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn record(&self, id: &ActorId) -> Option<SessionRecord> {
            self.records.lock().unwrap().get(id).cloned()
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn set_read_delay(&self, delay: Duration) {
            self.read_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
        }

        fn check(&self) -> WardenResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(WardenError::StoreUnavailable {
                    reason: "simulated outage".to_string(),
                });
            }
            Ok(())
        }
    }

    impl SessionStore for RecordingStore {
        fn get(&self, actor_id: &ActorId) -> WardenResult<Option<SessionRecord>> {
            let delay = self.read_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                std::thread::sleep(Duration::from_millis(delay));
            }
            self.check()?;
            Ok(self.records.lock().unwrap().get(actor_id).cloned())
        }

        fn set(&self, actor_id: &ActorId, record: &SessionRecord) -> WardenResult<()> {
            self.check()?;
            self.records.lock().unwrap().insert(*actor_id, record.clone());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Permission engine that allows exactly the listed nodes.
    struct AllowList(Vec<&'static str>);

    impl PermissionEngine for AllowList {
        fn has_permission(&self, _actor: &Actor, node: Option<&str>) -> bool {
            match node {
                None => true,
                Some(node) => self.0.contains(&node),
            }
        }

        fn is_in_group(&self, _actor: &Actor, group: &str) -> bool {
            group == "mods"
        }

        fn groups_of(&self, _actor: &Actor) -> Vec<String> {
            vec!["mods".to_string()]
        }
    }

    struct OneName(&'static str, ActorId);

    impl IdentityResolver for OneName {
        fn resolve(&self, name: &str) -> Option<ActorId> {
            (name == self.0).then_some(self.1)
        }
    }

    fn setup(start: i64) -> (Arc<RecordingStore>, Arc<ManualClock>) {
        (Arc::new(RecordingStore::default()), Arc::new(ManualClock::new(start)))
    }

    fn registry(store: &Arc<RecordingStore>, clock: &Arc<ManualClock>) -> Arc<SessionRegistry> {
        let config = HeartbeatConfig { interval_ms: TICK.as_millis() as u64 };
        Arc::new(SessionRegistry::new(store.clone(), clock.clone(), &config))
    }

    /// Poll `cond` until it holds or two seconds pass.
    async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cond()
    }

    async fn wait_stopped(tracker: &HeartbeatTracker) {
        let mut rx = tracker.watch_state();
        tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| *s == TrackerState::Stopped),
        )
        .await
        .expect("tracker did not stop in time")
        .expect("state channel closed");
    }

    // ── HeartbeatTracker ──────────────────────────────────────────────────────

    /// The first login creates the record with `first_login_at` and writes
    /// the first heartbeat right away.
    #[tokio::test]
    async fn test_first_login_creates_record_and_heartbeat() {
        let (store, clock) = setup(1_000);
        let id = ActorId::new_random();

        let tracker = HeartbeatTracker::start(id, store.clone(), clock.clone(), TICK)
            .await
            .unwrap();
        assert_eq!(tracker.session_start(), 1_000);

        assert!(eventually(|| store.record(&id).and_then(|r| r.last_seen(1_000)).is_some()).await);
        let record = store.record(&id).unwrap();
        assert_eq!(record.first_login_at.timestamp.timestamp(), 1_000);
        assert_eq!(record.first_login_at.timezone, "+00:00");
        assert_eq!(tracker.state(), TrackerState::Running);
    }

    /// A later login keeps `first_login_at` and adds a second session key.
    #[tokio::test]
    async fn test_relogin_keeps_first_login_and_adds_session() {
        let (store, clock) = setup(1_000);
        let id = ActorId::new_random();

        let first = HeartbeatTracker::start(id, store.clone(), clock.clone(), TICK)
            .await
            .unwrap();
        assert!(eventually(|| store.record(&id).is_some()).await);
        first.stop();
        wait_stopped(&first).await;

        clock.set(5_000);
        let second = HeartbeatTracker::start(id, store.clone(), clock.clone(), TICK)
            .await
            .unwrap();
        assert_eq!(second.session_start(), 5_000);
        assert!(eventually(|| store.record(&id).map(|r| r.session_count() == 2).unwrap_or(false)).await);

        let record = store.record(&id).unwrap();
        assert_eq!(record.first_login_at.timestamp.timestamp(), 1_000);
        assert!(record.last_seen(1_000).is_some());
        assert_eq!(record.last_seen(5_000), Some(5_000));
    }

    /// Two sessions starting in the same second get distinct keys.
    #[tokio::test]
    async fn test_same_second_relogin_gets_distinct_key() {
        let (store, clock) = setup(2_000);
        let id = ActorId::new_random();

        let first = HeartbeatTracker::start(id, store.clone(), clock.clone(), TICK)
            .await
            .unwrap();
        assert!(eventually(|| store.record(&id).and_then(|r| r.last_seen(2_000)).is_some()).await);
        first.stop();
        wait_stopped(&first).await;

        let second = HeartbeatTracker::start(id, store.clone(), clock.clone(), TICK)
            .await
            .unwrap();
        assert_eq!(second.session_start(), 2_001);
        assert!(eventually(|| store.record(&id).map(|r| r.session_count() == 2).unwrap_or(false)).await);
    }

    /// While running, the session's last-seen value follows the clock.
    #[tokio::test]
    async fn test_heartbeat_advances_while_running() {
        let (store, clock) = setup(3_000);
        let id = ActorId::new_random();
        let _tracker = HeartbeatTracker::start(id, store.clone(), clock.clone(), TICK)
            .await
            .unwrap();

        let mut previous = 3_000;
        for step in 1..=3 {
            clock.advance(1);
            let expected = 3_000 + step;
            assert!(
                eventually(|| store.record(&id).and_then(|r| r.last_seen(3_000)) == Some(expected)).await,
                "heartbeat should reach {expected}"
            );
            assert!(expected >= previous);
            previous = expected;
        }
    }

    /// After stop, no further writes happen even across many intervals.
    #[tokio::test]
    async fn test_no_writes_after_stop() {
        let (store, clock) = setup(4_000);
        let id = ActorId::new_random();
        let tracker = HeartbeatTracker::start(id, store.clone(), clock.clone(), TICK)
            .await
            .unwrap();
        assert!(eventually(|| store.writes() >= 3).await);

        tracker.stop();
        wait_stopped(&tracker).await;

        // Allow an in-flight write to settle before sampling.
        tokio::time::sleep(TICK).await;
        let writes = store.writes();
        let last_seen = store.record(&id).unwrap().last_seen(4_000);

        clock.advance(60);
        tokio::time::sleep(TICK * 6).await;

        assert_eq!(store.writes(), writes);
        assert_eq!(store.record(&id).unwrap().last_seen(4_000), last_seen);
    }

    /// Dropping the handle stops the task.
    #[tokio::test]
    async fn test_drop_cancels_tracker() {
        let (store, clock) = setup(4_500);
        let id = ActorId::new_random();
        let tracker = HeartbeatTracker::start(id, store.clone(), clock.clone(), TICK)
            .await
            .unwrap();
        let mut rx = tracker.watch_state();
        drop(tracker);

        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| *s == TrackerState::Stopped))
            .await
            .expect("tracker did not stop after drop")
            .unwrap();
    }

    /// Store outages are retried on later ticks without stopping the tracker.
    #[tokio::test]
    async fn test_store_failure_is_retried() {
        let (store, clock) = setup(6_000);
        store.set_failing(true);
        let id = ActorId::new_random();
        let tracker = HeartbeatTracker::start(id, store.clone(), clock.clone(), TICK)
            .await
            .unwrap();

        tokio::time::sleep(TICK * 4).await;
        assert_eq!(store.writes(), 0);
        assert_eq!(tracker.state(), TrackerState::Running);

        store.set_failing(false);
        assert!(eventually(|| store.record(&id).and_then(|r| r.last_seen(6_000)).is_some()).await);

        // The record was first created by a tick, so first login is still set once.
        let record = store.record(&id).unwrap();
        assert_eq!(record.first_login_at.timestamp.timestamp(), 6_000);
    }

    /// Starting a tracker outside a tokio runtime is a configuration error,
    /// reported on the first poll.
    #[test]
    fn test_start_requires_runtime() {
        let (store, clock) = setup(7_000);
        let start = std::pin::pin!(HeartbeatTracker::start(
            ActorId::new_random(),
            store,
            clock,
            TICK
        ));
        let mut cx = Context::from_waker(Waker::noop());
        match start.poll(&mut cx) {
            Poll::Ready(Err(WardenError::ConfigError { reason })) => {
                assert!(reason.contains("tokio runtime"), "unexpected reason: {reason}");
            }
            Poll::Ready(Err(other)) => panic!("expected ConfigError, got {other:?}"),
            Poll::Ready(Ok(_)) => panic!("expected ConfigError, got a running tracker"),
            Poll::Pending => panic!("expected ConfigError, start is pending"),
        }
    }

    /// Slow store IO during login runs off the calling task: other tasks on a
    /// single-threaded runtime keep making progress while `start` is pending.
    #[tokio::test]
    async fn test_start_does_not_block_the_runtime() {
        let (store, clock) = setup(7_500);
        store.set_read_delay(Duration::from_millis(200));
        let id = ActorId::new_random();

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = {
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let tracker = HeartbeatTracker::start(id, store.clone(), clock.clone(), TICK)
            .await
            .unwrap();
        counter.abort();

        assert_eq!(tracker.session_start(), 7_500);
        assert!(
            ticks.load(Ordering::SeqCst) >= 5,
            "runtime was stalled during login: {} ticks",
            ticks.load(Ordering::SeqCst)
        );
    }

    // ── SessionRegistry ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_registry_replaces_existing_tracker() {
        let (store, clock) = setup(8_000);
        let registry = registry(&store, &clock);
        let id = ActorId::new_random();

        let first = registry.start(id).await.unwrap();
        let mut first_state = registry.watch_state(&id).unwrap();
        clock.advance(10);
        let second = registry.start(id).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(registry.active_count(), 1);
        tokio::time::timeout(
            Duration::from_secs(2),
            first_state.wait_for(|s| *s == TrackerState::Stopped),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(registry.is_tracking(&id));
    }

    #[tokio::test]
    async fn test_registry_stop_session_ignores_stale_session() {
        let (store, clock) = setup(9_000);
        let registry = registry(&store, &clock);
        let id = ActorId::new_random();

        let stale = registry.start(id).await.unwrap();
        clock.advance(5);
        let current = registry.start(id).await.unwrap();

        assert!(!registry.stop_session(&id, stale));
        assert!(registry.is_tracking(&id));
        assert!(registry.stop_session(&id, current));
        assert!(!registry.is_tracking(&id));
        assert!(!registry.stop(&id));
    }

    #[tokio::test]
    async fn test_registry_shutdown_stops_everything() {
        let (store, clock) = setup(10_000);
        let registry = registry(&store, &clock);
        let ids: Vec<ActorId> = (0..3).map(|_| ActorId::new_random()).collect();
        let mut watchers = Vec::new();
        for id in &ids {
            registry.start(*id).await.unwrap();
            watchers.push(registry.watch_state(id).unwrap());
        }

        assert_eq!(registry.shutdown(), 3);
        assert_eq!(registry.active_count(), 0);
        for mut rx in watchers {
            tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| *s == TrackerState::Stopped))
                .await
                .unwrap()
                .unwrap();
        }
    }

    // ── ActorContext ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_context_delegates_permission_queries() {
        let (store, clock) = setup(11_000);
        let sessions = registry(&store, &clock);
        let actor = Actor::new(ActorId::new_random(), "Alex");
        let ctx = ActorContext::login(actor, Arc::new(AllowList(vec!["chat.send"])), sessions)
            .await
            .unwrap();

        assert!(ctx.has_permission(None));
        assert!(ctx.has_permission(Some("chat.send")));
        assert!(!ctx.has_permission(Some("area.edit")));
        assert!(ctx.is_in_group("mods"));
        assert_eq!(ctx.groups(), vec!["mods".to_string()]);
        assert_eq!(ctx.display_name(), "Alex");
    }

    #[tokio::test]
    async fn test_context_logout_stops_tracking() {
        let (store, clock) = setup(12_000);
        let sessions = registry(&store, &clock);
        let actor = Actor::new(ActorId::new_random(), "Steve");
        let id = actor.id;
        let ctx = ActorContext::login(actor, Arc::new(AllowList(vec![])), sessions.clone())
            .await
            .unwrap();

        assert!(sessions.is_tracking(&id));
        assert!(eventually(|| store.record(&id).is_some()).await);
        let first = ctx.first_login().unwrap().unwrap();
        assert_eq!(first.timestamp.timestamp(), 12_000);
        assert_eq!(ctx.session_start(), 12_000);

        let mut state = sessions.watch_state(&id).unwrap();
        ctx.logout();
        assert!(!sessions.is_tracking(&id));
        tokio::time::timeout(Duration::from_secs(2), state.wait_for(|s| *s == TrackerState::Stopped))
            .await
            .unwrap()
            .unwrap();
    }

    /// Dropping a stale context must not end the actor's newer session.
    #[tokio::test]
    async fn test_stale_context_drop_keeps_new_session() {
        let (store, clock) = setup(13_000);
        let sessions = registry(&store, &clock);
        let id = ActorId::new_random();
        let engine: Arc<dyn PermissionEngine> = Arc::new(AllowList(vec![]));

        let old = ActorContext::login(Actor::new(id, "Alex"), engine.clone(), sessions.clone())
            .await
            .unwrap();
        clock.advance(30);
        let new = ActorContext::login(Actor::new(id, "Alex"), engine, sessions.clone())
            .await
            .unwrap();

        drop(old);
        assert!(sessions.is_tracking(&id));
        drop(new);
        assert!(!sessions.is_tracking(&id));
    }

    #[tokio::test]
    async fn test_login_by_name() {
        let (store, clock) = setup(14_000);
        let sessions = registry(&store, &clock);
        let id = ActorId::new_random();
        let identity = OneName("Alex", id);
        let engine: Arc<dyn PermissionEngine> = Arc::new(AllowList(vec![]));

        let ctx = ActorContext::login_by_name("Alex", &identity, engine.clone(), sessions.clone())
            .await
            .unwrap();
        assert_eq!(ctx.id(), id);

        match ActorContext::login_by_name("Herobrine", &identity, engine, sessions).await {
            Err(WardenError::UnknownIdentity { name }) => assert_eq!(name, "Herobrine"),
            Err(other) => panic!("expected UnknownIdentity, got {other:?}"),
            Ok(_) => panic!("expected UnknownIdentity, got a context"),
        }
    }

    // ── WardenConfig ──────────────────────────────────────────────────────────

    #[test]
    fn test_config_defaults() {
        let config = WardenConfig::from_toml_str("").unwrap();
        assert!(config.resolver.short_circuit_unknown_actors);
        assert_eq!(config.heartbeat.interval(), Duration::from_secs(1));
        assert_eq!(config.store.root.to_str(), Some("warden-data/players"));
    }

    #[test]
    fn test_config_overrides() {
        let toml = r#"
            [resolver]
            short_circuit_unknown_actors = false

            [heartbeat]
            interval_ms = 250

            [store]
            root = "/var/lib/warden"
        "#;
        let config = WardenConfig::from_toml_str(toml).unwrap();
        assert!(!config.resolver.short_circuit_unknown_actors);
        assert_eq!(config.heartbeat.interval(), Duration::from_millis(250));
        assert_eq!(config.store.root.to_str(), Some("/var/lib/warden"));
    }

    #[test]
    fn test_config_rejects_zero_interval() {
        match WardenConfig::from_toml_str("[heartbeat]\ninterval_ms = 0\n") {
            Err(WardenError::ConfigError { reason }) => assert!(reason.contains("interval_ms")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn test_config_parse_error() {
        match WardenConfig::from_toml_str("this is not valid toml ][[[") {
            Err(WardenError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse warden config TOML"));
            }
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn test_manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now().timestamp(), 100);
        clock.advance(5);
        assert_eq!(clock.now().timestamp(), 105);
        clock.set(42);
        assert_eq!(clock.now().timestamp(), 42);
    }
}
