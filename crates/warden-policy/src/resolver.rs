//! Layered permission resolver.
//!
//! `SnapshotResolver` implements the `PermissionEngine` trait from
//! warden-core over a swappable `PermissionDatabase` snapshot and the legacy
//! override table.
//!
//! Evaluation algorithm, short-circuiting on the first decision:
//!
//! 1. No node requested (the "any" sentinel) → allow.
//! 2. The actor's own grants, in declaration order.
//! 3. Actor has no user record → deny. Groups, `Default`, and legacy
//!    overrides are never reached. (Disable with
//!    `ResolverConfig::short_circuit_unknown_actors = false`.)
//! 4. Each of the actor's groups in membership order, each group's grants in
//!    declaration order.
//! 5. The `Default` group's grants.
//! 6. The legacy override table, exact match, extensions in registration
//!    order.
//! 7. Nothing matched → deny by default.

use std::sync::Arc;

use tracing::{debug, warn};

use warden_contracts::{
    actor::{Actor, ActorId},
    permission::{LegacyOverrideTable, PermissionDatabase, PermissionGrant},
};
use warden_core::{config::ResolverConfig, traits::PermissionEngine};

use crate::{matcher, snapshot::Snapshot};

/// Which layer produced a decision. Logged, never returned to callers:
/// from outside, an explicit deny and an absent grant both read `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Source {
    AnyNode,
    UserGrant,
    UnknownActor,
    Group(String),
    DefaultGroup,
    Legacy(String),
    NoMatch,
}

/// A `PermissionEngine` reading the currently published snapshots.
///
/// ```rust,ignore
/// let database = Arc::new(Snapshot::new(loaded.database));
/// let legacy = Arc::new(Snapshot::new(loaded.legacy));
/// let resolver = SnapshotResolver::new(database.clone(), legacy, loaded.resolver);
///
/// // Later, on reload:
/// database.replace(reloaded.database);
/// ```
#[derive(Debug)]
pub struct SnapshotResolver {
    database: Arc<Snapshot<PermissionDatabase>>,
    legacy: Arc<Snapshot<LegacyOverrideTable>>,
    config: ResolverConfig,
}

impl SnapshotResolver {
    pub fn new(
        database: Arc<Snapshot<PermissionDatabase>>,
        legacy: Arc<Snapshot<LegacyOverrideTable>>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            database,
            legacy,
            config,
        }
    }

    /// A resolver over fixed contents with default configuration.
    pub fn from_parts(database: PermissionDatabase, legacy: LegacyOverrideTable) -> Self {
        Self::new(
            Arc::new(Snapshot::new(database)),
            Arc::new(Snapshot::new(legacy)),
            ResolverConfig::default(),
        )
    }

    /// The database snapshot this resolver reads; the host swaps it on reload.
    pub fn database(&self) -> &Arc<Snapshot<PermissionDatabase>> {
        &self.database
    }

    pub fn legacy(&self) -> &Arc<Snapshot<LegacyOverrideTable>> {
        &self.legacy
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn decide(&self, actor_id: &ActorId, node: Option<&str>) -> (bool, Source) {
        let Some(node) = node else {
            return (true, Source::AnyNode);
        };

        // One snapshot per decision, even if the host swaps mid-check.
        let db = self.database.load();
        let user = db.user(actor_id);

        if let Some(user) = user {
            if let Some(value) = first_match(&user.grants, node) {
                return (value, Source::UserGrant);
            }
        }

        match user {
            None if self.config.short_circuit_unknown_actors => {
                return (false, Source::UnknownActor);
            }
            None => {}
            Some(user) => {
                for name in &user.groups {
                    let Some(group) = db.group(name) else {
                        warn!(actor_id = %actor_id, group = %name, "user is a member of an undefined group");
                        continue;
                    };
                    if let Some(value) = first_match(&group.grants, node) {
                        return (value, Source::Group(name.clone()));
                    }
                }
            }
        }

        if let Some(value) = first_match(db.default_grants(), node) {
            return (value, Source::DefaultGroup);
        }

        if let Some((extension, value)) = self.legacy.load().lookup(node) {
            return (value, Source::Legacy(extension.to_string()));
        }

        (false, Source::NoMatch)
    }
}

impl PermissionEngine for SnapshotResolver {
    fn has_permission(&self, actor: &Actor, node: Option<&str>) -> bool {
        let (allowed, source) = self.decide(&actor.id, node);
        debug!(
            actor_id = %actor.id,
            node = node.unwrap_or("<any>"),
            allowed,
            source = ?source,
            "permission resolved"
        );
        allowed
    }

    fn is_in_group(&self, actor: &Actor, group: &str) -> bool {
        self.database
            .load()
            .user(&actor.id)
            .map(|user| user.groups.iter().any(|g| g == group))
            .unwrap_or(false)
    }

    fn groups_of(&self, actor: &Actor) -> Vec<String> {
        self.database
            .load()
            .user(&actor.id)
            .map(|user| user.groups.clone())
            .unwrap_or_default()
    }
}

/// Value of the first grant whose pattern matches `node`.
fn first_match(grants: &[PermissionGrant], node: &str) -> Option<bool> {
    grants
        .iter()
        .find(|grant| matcher::matches(&grant.pattern, node))
        .map(|grant| grant.value)
}

#[cfg(test)]
mod tests {
    use warden_contracts::permission::Group;

    use super::*;

    #[test]
    fn source_reports_deciding_layer() {
        let id = ActorId::new_random();
        let mut db = PermissionDatabase::new();
        db.insert_group(Group::new("mods").with_grant("area.*", true));
        db.insert_user(
            warden_contracts::permission::UserRecord::new(id)
                .with_group("mods")
                .with_grant("area.edit", false),
        );
        let mut legacy = LegacyOverrideTable::new();
        legacy.register("regions", "region.claim", true);
        let resolver = SnapshotResolver::from_parts(db, legacy);

        assert_eq!(resolver.decide(&id, None), (true, Source::AnyNode));
        assert_eq!(resolver.decide(&id, Some("area.edit")), (false, Source::UserGrant));
        assert_eq!(
            resolver.decide(&id, Some("area.view")),
            (true, Source::Group("mods".to_string()))
        );
        assert_eq!(
            resolver.decide(&id, Some("region.claim")),
            (true, Source::Legacy("regions".to_string()))
        );
        assert_eq!(resolver.decide(&id, Some("chat.send")), (false, Source::NoMatch));
        assert_eq!(
            resolver.decide(&ActorId::new_random(), Some("area.view")),
            (false, Source::UnknownActor)
        );
    }
}
