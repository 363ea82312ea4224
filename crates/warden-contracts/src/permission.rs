//! Permission data model: grants, groups, user records, and the legacy
//! override table.
//!
//! Every holder keeps its grants in a `Vec` because declaration order is
//! significant: the first grant whose pattern matches a node decides it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;

/// Name of the group consulted for every actor that has a user record.
pub const DEFAULT_GROUP: &str = "Default";

/// A `(pattern, value)` pair asserting allow (`true`) or deny (`false`) for
/// every node the pattern matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Dotted node pattern, optionally containing `*`, `?` or `[...]`.
    pub pattern: String,
    /// The decision returned when `pattern` matches.
    pub value: bool,
}

impl PermissionGrant {
    pub fn new(pattern: impl Into<String>, value: bool) -> Self {
        Self {
            pattern: pattern.into(),
            value,
        }
    }

    pub fn allow(pattern: impl Into<String>) -> Self {
        Self::new(pattern, true)
    }

    pub fn deny(pattern: impl Into<String>) -> Self {
        Self::new(pattern, false)
    }
}

/// A named, reusable bundle of grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Ordered; first match wins.
    #[serde(default)]
    pub grants: Vec<PermissionGrant>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grants: Vec::new(),
        }
    }

    /// Builder-style helper that appends a grant.
    pub fn with_grant(mut self, pattern: impl Into<String>, value: bool) -> Self {
        self.grants.push(PermissionGrant::new(pattern, value));
        self
    }
}

/// Per-actor permission entry.
///
/// The mere presence of a `UserRecord` changes resolution: an actor without
/// one is denied before any group is consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(alias = "id")]
    pub actor_id: ActorId,
    /// Group names in membership order.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Direct grants, consulted before any group.
    #[serde(default)]
    pub grants: Vec<PermissionGrant>,
}

impl UserRecord {
    pub fn new(actor_id: ActorId) -> Self {
        Self {
            actor_id,
            groups: Vec::new(),
            grants: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn with_grant(mut self, pattern: impl Into<String>, value: bool) -> Self {
        self.grants.push(PermissionGrant::new(pattern, value));
        self
    }
}

/// In-memory snapshot of users and groups.
///
/// The `Default` group always exists: every constructor inserts it and
/// `insert_group` can only replace it, never remove it. `users` is sparse;
/// a missing entry is a distinct state from an empty record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDatabase {
    users: HashMap<ActorId, UserRecord>,
    groups: HashMap<String, Group>,
}

impl PermissionDatabase {
    /// An empty database containing only an empty `Default` group.
    pub fn new() -> Self {
        let mut groups = HashMap::new();
        groups.insert(DEFAULT_GROUP.to_string(), Group::new(DEFAULT_GROUP));
        Self {
            users: HashMap::new(),
            groups,
        }
    }

    /// Insert or replace a group, keyed by its name.
    pub fn insert_group(&mut self, group: Group) {
        self.groups.insert(group.name.clone(), group);
    }

    /// Insert or replace a user record, keyed by its actor id.
    pub fn insert_user(&mut self, user: UserRecord) {
        self.users.insert(user.actor_id, user);
    }

    pub fn user(&self, actor_id: &ActorId) -> Option<&UserRecord> {
        self.users.get(actor_id)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Grants of the `Default` group, in declaration order.
    pub fn default_grants(&self) -> &[PermissionGrant] {
        self.groups
            .get(DEFAULT_GROUP)
            .map(|g| g.grants.as_slice())
            .unwrap_or(&[])
    }

    pub fn users(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Every grant pattern in the database, with the holder that declares it.
    ///
    /// Used by loaders to validate wildcard syntax.
    pub fn patterns(&self) -> impl Iterator<Item = (String, &str)> {
        let from_groups = self.groups.values().flat_map(|g| {
            g.grants
                .iter()
                .map(move |grant| (format!("group '{}'", g.name), grant.pattern.as_str()))
        });
        let from_users = self.users.values().flat_map(|u| {
            u.grants
                .iter()
                .map(move |grant| (format!("user '{}'", u.actor_id), grant.pattern.as_str()))
        });
        from_groups.chain(from_users)
    }
}

impl Default for PermissionDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat, exact-match permission table contributed by installed extensions.
///
/// Consulted only after users, groups, and `Default` produced no decision.
/// Extensions are scanned in registration order, so when two extensions
/// define the same node the one registered first wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyOverrideTable {
    entries: Vec<(String, HashMap<String, bool>)>,
}

impl LegacyOverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `node = value` for `extension_id`.
    ///
    /// A new extension is appended after all existing ones; re-registering a
    /// node for a known extension overwrites its value in place without
    /// changing the extension's priority.
    pub fn register(&mut self, extension_id: &str, node: impl Into<String>, value: bool) {
        let node = node.into();
        match self.entries.iter_mut().find(|(id, _)| id == extension_id) {
            Some((_, nodes)) => {
                nodes.insert(node, value);
            }
            None => {
                let mut nodes = HashMap::new();
                nodes.insert(node, value);
                self.entries.push((extension_id.to_string(), nodes));
            }
        }
    }

    /// Exact-match lookup. Returns the owning extension and the value of the
    /// first registration of `node`.
    pub fn lookup(&self, node: &str) -> Option<(&str, bool)> {
        self.entries
            .iter()
            .find_map(|(id, nodes)| nodes.get(node).map(|value| (id.as_str(), *value)))
    }

    /// Extension ids in registration order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
