//! Runtime error types for the warden runtime.
//!
//! Permission checks never produce these: a denied node is a plain `false`.
//! Errors are reserved for storage, configuration, and identity failures.

use thiserror::Error;

/// The unified error type for the warden runtime.
#[derive(Debug, Error)]
pub enum WardenError {
    /// The session store could not serve a read or accept a write.
    ///
    /// The heartbeat tracker treats this as transient and retries on its
    /// next tick. It is never surfaced to the actor.
    #[error("session store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// A permission pattern uses malformed wildcard syntax.
    ///
    /// Only reported by validation. During resolution such a pattern simply
    /// never matches, preserving default-deny.
    #[error("invalid permission pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A required configuration value is missing or a config/permission
    /// file could not be read or parsed.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The identity resolver has no UUID for the given display name.
    #[error("no identity known for player '{name}'")]
    UnknownIdentity { name: String },

    /// A session record could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

/// Convenience alias used throughout the warden crates.
pub type WardenResult<T> = Result<T, WardenError>;
