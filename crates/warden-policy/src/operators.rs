//! Server operator list.
//!
//! Reads the game server's `ops.json`, an array of entries such as
//!
//! ```json
//! [{"uuid": "8667ba71-b85a-4004-af54-457a9734eed7", "name": "Notch", "level": 4, "bypassesPlayerLimit": false}]
//! ```
//!
//! An actor is an operator if either its id or its display name appears.

use std::path::Path;

use serde::{Deserialize, Serialize};

use warden_contracts::{
    actor::{Actor, ActorId},
    error::{WardenError, WardenResult},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorEntry {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub level: u8,
    #[serde(default)]
    pub bypasses_player_limit: bool,
}

impl OperatorEntry {
    fn is(&self, actor: &Actor) -> bool {
        let same_id = self
            .uuid
            .parse::<ActorId>()
            .map(|id| id == actor.id)
            .unwrap_or(false);
        same_id || self.name == actor.display_name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorList {
    entries: Vec<OperatorEntry>,
}

impl OperatorList {
    pub fn new(entries: Vec<OperatorEntry>) -> Self {
        Self { entries }
    }

    /// Parse an `ops.json` document.
    pub fn from_json_str(s: &str) -> WardenResult<Self> {
        let entries: Vec<OperatorEntry> =
            serde_json::from_str(s).map_err(|e| WardenError::ConfigError {
                reason: format!("failed to parse operator list: {}", e),
            })?;
        Ok(Self { entries })
    }

    pub fn from_file(path: &Path) -> WardenResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| WardenError::ConfigError {
            reason: format!("failed to read operator list '{}': {}", path.display(), e),
        })?;
        Self::from_json_str(&contents)
    }

    pub fn is_operator(&self, actor: &Actor) -> bool {
        self.entries.iter().any(|entry| entry.is(actor))
    }

    /// The operator level granted to `actor`, if any.
    pub fn level_of(&self, actor: &Actor) -> Option<u8> {
        self.entries
            .iter()
            .find(|entry| entry.is(actor))
            .map(|entry| entry.level)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
