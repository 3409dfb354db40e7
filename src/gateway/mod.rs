//! Inbound HTTP surface.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → server.rs (request ID, trace span, admin or catch-all route)
//!     → convert.rs (axum Request → RequestDescriptor)
//!     → Pipeline::dispatch
//!     → convert.rs (ResponseSnapshot | PipelineError → axum Response)
//! ```

pub mod convert;
pub mod server;

pub use server::{build_router, AppState, GatewayServer};
