//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every dispatch produces:
//!     → logging.rs (structured log events, one span per dispatch)
//!     → metrics.rs (Prometheus counters, gauges, histograms)
//!     → recorder.rs (bounded in-memory log served by the admin API)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Dispatch ID flows through all events of one dispatch
//! - Metrics are cheap (atomic increments behind the facade)
//! - The request log is bounded; slow requests are flagged, not dropped

pub mod logging;
pub mod metrics;
pub mod recorder;

pub use recorder::{MetricsRecorder, RequestMetric};
