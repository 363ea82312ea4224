//! Loading permission databases from disk.
//!
//! Two formats are accepted.
//!
//! **Native TOML**: grants are arrays, so declaration order is explicit.
//!
//! ```toml
//! [resolver]
//! short_circuit_unknown_actors = true
//!
//! [[groups]]
//! name = "Default"
//! grants = [{ pattern = "chat.*", value = true }]
//!
//! [[groups]]
//! name = "mods"
//! grants = [{ pattern = "area.*", value = true }]
//!
//! [[users]]
//! id = "8667ba71-b85a-4004-af54-457a9734eed7"
//! groups = ["mods"]
//! grants = [{ pattern = "area.edit", value = false }]
//!
//! [[legacy]]
//! extension = "regions"
//! nodes = { "region.claim" = true }
//! ```
//!
//! **Wrapper JSON**: the server wrapper's `permissions.json` layout, where
//! each holder's `permissions` object maps pattern → value. Object keys are
//! read in document order, which becomes grant order.
//!
//! Both loaders guarantee a `Default` group and log every malformed
//! wildcard pattern at `warn`. Such patterns are kept and never match.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    path::Path,
};

use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};
use tracing::{info, warn};

use warden_contracts::{
    actor::ActorId,
    error::{WardenError, WardenResult},
    permission::{Group, LegacyOverrideTable, PermissionDatabase, PermissionGrant, UserRecord},
};
use warden_core::config::ResolverConfig;

use crate::matcher;

/// Everything a permission file can configure.
#[derive(Debug, Clone)]
pub struct LoadedPermissions {
    pub database: PermissionDatabase,
    pub legacy: LegacyOverrideTable,
    /// `None` when the file has no `[resolver]` table, so the host's own
    /// configuration applies.
    pub resolver: Option<ResolverConfig>,
}

// ── Native TOML ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PermissionFile {
    #[serde(default)]
    resolver: Option<ResolverConfig>,
    #[serde(default)]
    groups: Vec<Group>,
    #[serde(default)]
    users: Vec<UserRecord>,
    #[serde(default)]
    legacy: Vec<LegacyEntry>,
}

#[derive(Debug, Deserialize)]
struct LegacyEntry {
    extension: String,
    #[serde(default)]
    nodes: BTreeMap<String, bool>,
}

/// Parse a native TOML permission document.
///
/// Returns `WardenError::ConfigError` if the TOML is malformed or does not
/// match the schema.
pub fn from_toml_str(s: &str) -> WardenResult<LoadedPermissions> {
    let file: PermissionFile = toml::from_str(s).map_err(|e| WardenError::ConfigError {
        reason: format!("failed to parse permissions TOML: {}", e),
    })?;

    let mut database = PermissionDatabase::new();
    let mut declared = HashSet::new();
    for group in file.groups {
        if !declared.insert(group.name.clone()) {
            warn!(group = %group.name, "group declared twice; later declaration wins");
        }
        database.insert_group(group);
    }
    for user in file.users {
        if database.user(&user.actor_id).is_some() {
            warn!(actor_id = %user.actor_id, "user declared twice; later declaration wins");
        }
        database.insert_user(user);
    }

    let mut legacy = LegacyOverrideTable::new();
    for entry in file.legacy {
        for (node, value) in entry.nodes {
            legacy.register(&entry.extension, node, value);
        }
    }

    report_invalid_patterns(&database);

    Ok(LoadedPermissions {
        database,
        legacy,
        resolver: file.resolver,
    })
}

// ── Wrapper JSON ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WrapperFile {
    #[serde(default)]
    groups: BTreeMap<String, WrapperGroup>,
    #[serde(default)]
    users: BTreeMap<ActorId, WrapperUser>,
}

#[derive(Debug, Deserialize)]
struct WrapperGroup {
    #[serde(default)]
    permissions: OrderedGrants,
}

#[derive(Debug, Deserialize)]
struct WrapperUser {
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    permissions: OrderedGrants,
}

/// A `{pattern: value}` object read into a `Vec`, preserving key order.
#[derive(Debug, Default)]
struct OrderedGrants(Vec<PermissionGrant>);

impl<'de> Deserialize<'de> for OrderedGrants {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GrantsVisitor;

        impl<'de> Visitor<'de> for GrantsVisitor {
            type Value = OrderedGrants;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of permission pattern to boolean")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut grants = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((pattern, value)) = map.next_entry::<String, bool>()? {
                    grants.push(PermissionGrant::new(pattern, value));
                }
                Ok(OrderedGrants(grants))
            }
        }

        deserializer.deserialize_map(GrantsVisitor)
    }
}

/// Parse a wrapper-format `permissions.json` document.
///
/// The wrapper format carries no legacy overrides or resolver settings.
pub fn from_wrapper_json_str(s: &str) -> WardenResult<PermissionDatabase> {
    let file: WrapperFile = serde_json::from_str(s).map_err(|e| WardenError::ConfigError {
        reason: format!("failed to parse wrapper permissions JSON: {}", e),
    })?;

    let mut database = PermissionDatabase::new();
    for (name, group) in file.groups {
        database.insert_group(Group {
            name,
            grants: group.permissions.0,
        });
    }
    for (actor_id, user) in file.users {
        database.insert_user(UserRecord {
            actor_id,
            groups: user.groups,
            grants: user.permissions.0,
        });
    }

    report_invalid_patterns(&database);
    Ok(database)
}

// ── Files ─────────────────────────────────────────────────────────────────────

/// Read a permission file, choosing the format by extension: `.json` is the
/// wrapper format, anything else is native TOML.
pub fn from_file(path: &Path) -> WardenResult<LoadedPermissions> {
    let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
        reason: format!("failed to read permissions file '{}': {}", path.display(), e),
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let loaded = if is_json {
        LoadedPermissions {
            database: from_wrapper_json_str(&contents)?,
            legacy: LegacyOverrideTable::new(),
            resolver: None,
        }
    } else {
        from_toml_str(&contents)?
    };

    info!(
        path = %path.display(),
        users = loaded.database.users().count(),
        groups = loaded.database.groups().count(),
        "permissions loaded"
    );
    Ok(loaded)
}

/// Every malformed pattern in `database`, as `InvalidPattern` errors.
pub fn invalid_patterns(database: &PermissionDatabase) -> Vec<WardenError> {
    database
        .patterns()
        .filter_map(|(_, pattern)| matcher::validate(pattern).err())
        .collect()
}

fn report_invalid_patterns(database: &PermissionDatabase) {
    for (holder, pattern) in database.patterns() {
        if let Err(e) = matcher::validate(pattern) {
            warn!(holder = %holder, error = %e, "pattern will never match");
        }
    }
}
