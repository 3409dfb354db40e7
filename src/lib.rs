//! Caching, coalescing, retrying HTTP request pipeline.
//!
//! The [`Pipeline`] sits between callers and an upstream HTTP API. GETs to
//! allow-listed endpoints are cached with per-endpoint TTLs, identical
//! in-flight GETs share one upstream call, transient failures are retried
//! with exponential backoff under a per-endpoint deadline, and every
//! completed request is recorded for the admin API.

// Core request path
pub mod cache;
pub mod dedup;
pub mod pipeline;
pub mod request;
pub mod resilience;
pub mod routing;
pub mod transport;

// Outer surface
pub mod admin;
pub mod gateway;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::PipelineConfig;
pub use gateway::GatewayServer;
pub use lifecycle::Shutdown;
pub use pipeline::{ErrorKind, Pipeline, PipelineError};
pub use request::{Method, RequestDescriptor, ResponseSnapshot};
pub use transport::{HttpTransport, Transport, TransportError};
