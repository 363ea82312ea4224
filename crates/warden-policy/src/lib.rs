//! # warden-policy
//!
//! A layered, wildcard-aware, deny-by-default permission resolver for the
//! warden runtime.
//!
//! ## Overview
//!
//! This crate provides [`SnapshotResolver`], which implements the
//! [`PermissionEngine`](warden_core::traits::PermissionEngine) trait. Grants
//! live on users, groups, and the always-present `Default` group; each holder
//! is scanned in declaration order and the first matching pattern wins. An
//! exact-match legacy table is consulted last. If nothing matches, the node
//! is denied.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use warden_policy::{loader, SnapshotResolver, Snapshot};
//!
//! let loaded = loader::from_file(Path::new("permissions.toml"))?;
//! let resolver = SnapshotResolver::new(
//!     Arc::new(Snapshot::new(loaded.database)),
//!     Arc::new(Snapshot::new(loaded.legacy)),
//!     loaded.resolver.unwrap_or_default(),
//! );
//! ```
//!
//! ## Pattern matching
//!
//! Grant patterns are shell globs over the whole node: `*`, `?`, and `[...]`.
//! See [`matcher`].

pub mod loader;
pub mod matcher;
pub mod operators;
pub mod resolver;
pub mod snapshot;

pub use loader::LoadedPermissions;
pub use operators::OperatorList;
pub use resolver::SnapshotResolver;
pub use snapshot::Snapshot;

// ── Tests ─────────────────────────────────────────────────────────────────────
