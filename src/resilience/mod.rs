//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch of one request:
//!     → timeouts.rs (deadline for the whole dispatch)
//!         → attempt
//!         → On failure: retries.rs (retryable? budget left?)
//!         → backoff.rs (sleep, then next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeout and retry are independent: the deadline wraps the retry loop,
//!   it is not reset per attempt
//! - Retries only for idempotent requests (GET, HEAD, OPTIONS)
//! - Policies are pure functions of the request and the current config

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use backoff::calculate_backoff;
pub use retries::{retry_plan_for, RetryPlan};
pub use timeouts::timeout_for;
