//! Per-actor context: the object a host holds for each logged-in player.
//!
//! Constructing a context is the login event. It starts exactly one
//! heartbeat tracker through the shared `SessionRegistry` and keeps a handle
//! to the shared `PermissionEngine` for capability checks. Logging out, or
//! simply dropping the context, cancels the tracker without waiting for it.

use std::sync::Arc;

use tracing::info;

use warden_contracts::{
    actor::{Actor, ActorId},
    error::{WardenError, WardenResult},
    session::{FirstLogin, SessionRecord},
};

use crate::{
    registry::SessionRegistry,
    traits::{IdentityResolver, PermissionEngine},
};

pub struct ActorContext {
    actor: Actor,
    permissions: Arc<dyn PermissionEngine>,
    sessions: Arc<SessionRegistry>,
    session_start: i64,
}

impl ActorContext {
    /// Log `actor` in: start its session tracker and bind the permission
    /// engine.
    pub async fn login(
        actor: Actor,
        permissions: Arc<dyn PermissionEngine>,
        sessions: Arc<SessionRegistry>,
    ) -> WardenResult<Self> {
        let session_start = sessions.start(actor.id).await?;
        info!(
            actor_id = %actor.id,
            name = %actor.display_name,
            session_start,
            "actor logged in"
        );
        Ok(Self {
            actor,
            permissions,
            sessions,
            session_start,
        })
    }

    /// Resolve `name` to an actor id first, then log in.
    ///
    /// Returns `WardenError::UnknownIdentity` if the resolver has no id for
    /// the name.
    pub async fn login_by_name(
        name: &str,
        identity: &dyn IdentityResolver,
        permissions: Arc<dyn PermissionEngine>,
        sessions: Arc<SessionRegistry>,
    ) -> WardenResult<Self> {
        let id = identity
            .resolve(name)
            .ok_or_else(|| WardenError::UnknownIdentity {
                name: name.to_string(),
            })?;
        Self::login(Actor::new(id, name), permissions, sessions).await
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn id(&self) -> ActorId {
        self.actor.id
    }

    pub fn display_name(&self) -> &str {
        &self.actor.display_name
    }

    /// Key of the current session in the actor's heartbeat history.
    pub fn session_start(&self) -> i64 {
        self.session_start
    }

    // ── Permissions ──────────────────────────────────────────────────────────

    /// Whether this actor holds `node`; `None` asks for no specific
    /// capability and is always allowed.
    pub fn has_permission(&self, node: Option<&str>) -> bool {
        self.permissions.has_permission(&self.actor, node)
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.permissions.is_in_group(&self.actor, group)
    }

    pub fn groups(&self) -> Vec<String> {
        self.permissions.groups_of(&self.actor)
    }

    // ── Session history ──────────────────────────────────────────────────────

    /// The persisted session record, if one has been written yet.
    pub fn session_record(&self) -> WardenResult<Option<SessionRecord>> {
        self.sessions.store().get(&self.actor.id)
    }

    /// When the actor first ever logged in.
    pub fn first_login(&self) -> WardenResult<Option<FirstLogin>> {
        Ok(self.session_record()?.map(|r| r.first_login_at))
    }

    /// End the session. Returns immediately; the tracker stops within one
    /// tick.
    pub fn logout(self) {
        drop(self);
    }
}

impl Drop for ActorContext {
    fn drop(&mut self) {
        if self.sessions.stop_session(&self.actor.id, self.session_start) {
            info!(
                actor_id = %self.actor.id,
                session_start = self.session_start,
                "actor logged out"
            );
        }
    }
}
