//! Request model and outbound transformation.
//!
//! # Data Flow
//! ```text
//! caller builds RequestDescriptor
//!     → optimizer.rs (fill compression/accept/cache-control/validator headers)
//!     → descriptor.rs key() (identity for cache and coalescing)
//!     → pipeline
//! ```

pub mod descriptor;
pub mod optimizer;

pub use descriptor::{Method, RequestDescriptor, RequestKey, ResponseSnapshot, UnsupportedMethod};
pub use optimizer::optimize;
