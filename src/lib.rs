//! Strata - tiered cache facade
//!
//! An ordered stack of heterogeneous cache backends (process-local memory,
//! shared network caches, durable stores) presented as a single key/value
//! cache, coordinated under partial failure.
//!
//! # Features
//!
//! - **Priority-ordered layers**: reads cascade from the fastest tier down
//! - **Per-tier circuit breakers**: an unhealthy backend is skipped in
//!   bounded time and probed back into service
//! - **Write strategies**: write-through fan-out or first-acceptor writes
//! - **Recovery populate**: deeper-tier hits back-fill healthy upper tiers
//!   with the remaining lifetime of the value
//! - **Per-tier TTL ceilings**: each layer caps the lifetime of what it
//!   stores
//! - **Dependency invalidation**: tag-style snapshot dependencies stored
//!   alongside values, validated on read
//! - **Compatibility mode**: raw values written by external writers remain
//!   readable next to facade-written envelopes

// Public API modules
pub mod prelude;
pub mod strata;

// Cache implementation modules - traits are public for user implementations
pub mod cache;

// Re-export the public API at the crate root for convenience
pub use prelude::*;
pub use strata::{Strata, StrataBuilder};
