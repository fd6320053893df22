//! Common types module for the catering orchestrator.
//!
//! This module defines the core data types and structures shared by every
//! crate in the workspace: the canonical status vocabulary, the durable
//! order model, the ephemeral tracking record, provider wire types and the
//! provider error taxonomy, orchestration events, and storage namespaces.

/// Orchestration event types for inter-component communication.
pub mod events;
/// Durable order model and order items.
pub mod order;
/// Provider wire types and the provider error taxonomy.
pub mod provider;
/// Canonical status enum and per-provider status maps.
pub mod status;
/// Storage namespace identifiers.
pub mod storage;
/// Ephemeral tracking record schema.
pub mod tracking;

// Re-export all types for convenient access
pub use events::*;
pub use order::*;
pub use provider::*;
pub use status::*;
pub use storage::*;
pub use tracking::*;
