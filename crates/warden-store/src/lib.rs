//! # warden-store
//!
//! Session record stores and identity lookup for the warden runtime.
//!
//! ## Overview
//!
//! Two implementations of the [`SessionStore`](warden_core::traits::SessionStore)
//! trait:
//!
//! - [`InMemorySessionStore`] keeps records in a mutex-guarded map.
//! - [`JsonFileSessionStore`] keeps one `<uuid>.json` file per actor under a
//!   root directory, replacing it atomically on every write.
//!
//! [`StaticIdentityResolver`] maps display names to actor ids for
//! `ActorContext::login_by_name`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_core::{clock::SystemClock, SessionRegistry};
//! use warden_store::JsonFileSessionStore;
//!
//! let store = Arc::new(JsonFileSessionStore::new(&config.store.root));
//! let sessions = Arc::new(SessionRegistry::new(store, Arc::new(SystemClock), &config.heartbeat));
//! ```

pub mod file;
pub mod identity;
pub mod memory;

pub use file::JsonFileSessionStore;
pub use identity::StaticIdentityResolver;
pub use memory::InMemorySessionStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
