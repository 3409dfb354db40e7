//! Request coalescing.
//!
//! Concurrent GETs with the same key share one dispatch. The registry maps a
//! key to a `Shared` future over the dispatch task; joiners clone the handle.

pub mod registry;

pub use registry::{Coalesced, DispatchOutcome, PendingGuard, PendingRequestRegistry, SharedDispatch};
