//! Core trait definitions for the warden runtime.
//!
//! These traits are the seams between the actor context and its external
//! collaborators:
//!
//! - `PermissionEngine` — trusted, synchronous capability decisions
//! - `SessionStore`     — durable per-actor session records
//! - `IdentityResolver` — display name → actor id lookup
//!
//! Everything behind them is supplied by the host application or by the
//! sibling crates (`warden-policy`, `warden-store`).

use warden_contracts::{
    actor::{Actor, ActorId},
    error::WardenResult,
    session::SessionRecord,
};

/// Decides whether an actor may perform a capability.
///
/// Implementations must be pure reads of a permission snapshot: safe to call
/// concurrently from every actor context, non-blocking, and free of side
/// effects. A denied node is `false`, never an error.
pub trait PermissionEngine: Send + Sync {
    /// Return whether `actor` holds `node`.
    ///
    /// `None` is the "any" sentinel — no specific capability requested — and
    /// is always allowed.
    fn has_permission(&self, actor: &Actor, node: Option<&str>) -> bool;

    /// Return true iff the actor has a user record listing `group`.
    fn is_in_group(&self, actor: &Actor, group: &str) -> bool;

    /// The actor's groups in membership order; empty when the actor has no
    /// user record.
    fn groups_of(&self, actor: &Actor) -> Vec<String>;
}

/// Durable mapping from actor id to that actor's session record.
///
/// Implementations must tolerate concurrent writers for different actors
/// and a concurrent writer and reader for the same actor. Callers compose
/// read-modify-write themselves; last write wins per key.
pub trait SessionStore: Send + Sync {
    /// Fetch the record for `actor_id`, or `None` if the actor never logged in.
    fn get(&self, actor_id: &ActorId) -> WardenResult<Option<SessionRecord>>;

    /// Replace the record for `actor_id`.
    fn set(&self, actor_id: &ActorId, record: &SessionRecord) -> WardenResult<()>;
}

/// Maps a player's display name to their stable id.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<ActorId>;
}
