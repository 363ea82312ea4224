//! # warden-contracts
//!
//! Shared types, records, and contracts for the warden runtime.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod actor;
pub mod error;
pub mod permission;
pub mod session;
