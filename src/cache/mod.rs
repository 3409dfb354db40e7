//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! GET request
//!     → policy.rs should_cache (method, markers, allow-listed prefixes)
//!     → store.rs lookup (fresh hit returned, stale entry purged)
//!     → on miss, after a successful dispatch:
//!         policy.rs ttl_for → store.rs admit (oldest-quarter eviction at capacity)
//!
//! Successful API GETs with an ETag:
//!     → validators.rs put (read back by the request optimizer)
//! ```
//!
//! # Design Decisions
//! - Entries are immutable snapshots; a refresh replaces the whole entry
//! - Eviction removes a quarter of the store at once, not a single LRU entry
//! - Monotonic tokio clock, so paused-time tests drive expiry

pub mod policy;
pub mod store;
pub mod sweeper;
pub mod validators;

pub use policy::{should_cache, ttl_for};
pub use store::{CacheEntry, CacheEntryStats, CacheStats, CacheStore};
pub use sweeper::CacheSweeper;
pub use validators::{MemoryValidatorStore, ValidatorStore};
