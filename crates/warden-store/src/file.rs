//! JSON-file implementation of `SessionStore`.
//!
//! One file per actor, `<root>/<uuid>.json`, holding the serialized
//! `SessionRecord`. Each write goes to a fresh sibling temporary file that is
//! then renamed over the target, so a reader never observes a half-written
//! record.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use warden_contracts::{
    actor::ActorId,
    error::{WardenError, WardenResult},
    session::SessionRecord,
};
use warden_core::traits::SessionStore;

#[derive(Debug, Clone)]
pub struct JsonFileSessionStore {
    root: PathBuf,
}

impl JsonFileSessionStore {
    /// A store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record file for `actor_id`.
    pub fn path_for(&self, actor_id: &ActorId) -> PathBuf {
        self.root.join(format!("{}.json", actor_id))
    }

    /// Every actor with a record file under the root, in no particular order.
    ///
    /// Files whose stem is not a UUID are ignored. A missing root yields an
    /// empty list.
    pub fn actor_ids(&self) -> WardenResult<Vec<ActorId>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(unavailable("list", &self.root, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| unavailable("list", &self.root, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<ActorId>().ok())
                {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}

impl SessionStore for JsonFileSessionStore {
    fn get(&self, actor_id: &ActorId) -> WardenResult<Option<SessionRecord>> {
        let path = self.path_for(actor_id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable("read", &path, e)),
        };
        let record = serde_json::from_str(&contents).map_err(|e| WardenError::Serialization {
            reason: format!("session record '{}' is malformed: {}", path.display(), e),
        })?;
        Ok(Some(record))
    }

    fn set(&self, actor_id: &ActorId, record: &SessionRecord) -> WardenResult<()> {
        let json = serde_json::to_vec_pretty(record).map_err(|e| WardenError::Serialization {
            reason: format!("failed to encode session record for {}: {}", actor_id, e),
        })?;

        fs::create_dir_all(&self.root).map_err(|e| unavailable("create", &self.root, e))?;

        let path = self.path_for(actor_id);
        // Each write stages into its own uniquely named file.
        let mut staging =
            NamedTempFile::new_in(&self.root).map_err(|e| unavailable("stage", &self.root, e))?;
        staging
            .write_all(&json)
            .map_err(|e| unavailable("write", staging.path(), e))?;
        staging
            .persist(&path)
            .map_err(|e| unavailable("replace", &path, e.error))?;

        debug!(actor_id = %actor_id, path = %path.display(), "session record written");
        Ok(())
    }
}

fn unavailable(op: &str, path: &Path, e: std::io::Error) -> WardenError {
    WardenError::StoreUnavailable {
        reason: format!("failed to {} '{}': {}", op, path.display(), e),
    }
}
