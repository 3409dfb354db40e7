//! Request pipeline.
//!
//! # Data Flow
//! ```text
//! RequestDescriptor
//!     → request::optimize (headers, conditional validators)
//!     → cache::CacheStore (fresh hit returns immediately)
//!     → dedup::PendingRequestRegistry (join an identical in-flight GET)
//!     → dispatch task: timeout ⊃ retry loop ⊃ Transport::send
//!     → cache admission, request metric, registry release
//! ```
//!
//! # Design Decisions
//! - Every dispatch runs in its own task, so a caller going away never
//!   aborts work other callers are waiting on
//! - The timeout bounds the whole retry sequence, not each attempt
//! - Mutations are never cached, coalesced or retried

pub mod dispatch;
pub mod error;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{Pipeline, PrefetchFailure, PrefetchReport};
pub use error::{ErrorKind, PipelineError};
