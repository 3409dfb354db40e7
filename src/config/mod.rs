//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PipelineConfig (validated, immutable)
//!     → held by the Pipeline behind an ArcSwap
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → Pipeline::reload swaps the Arc<PipelineConfig>
//!     → the next dispatch observes the new policies
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Endpoint tables are keyed by path prefix, longest prefix wins

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, CacheConfig, GatewayConfig, MetricsConfig, ObservabilityConfig,
    OptimizerConfig, PipelineConfig, RetryConfig, RetryOverride, TimeoutConfig,
    UpstreamConfig, ValidatorConfig,
};
