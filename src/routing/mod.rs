//! Endpoint classification.
//!
//! Every policy in the pipeline (cacheability, TTL, timeout, retry budget,
//! header rules) is keyed by URL path prefix or file extension. The helpers
//! here are the single place those lookups happen.

pub mod matcher;

pub use matcher::{extension, has_extension, longest_prefix, matches_any_prefix};
