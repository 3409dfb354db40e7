//! Upstream transport abstraction.
//!
//! The pipeline never talks to the network directly; it hands a fully
//! optimized [`RequestDescriptor`] to a [`Transport`] and gets back either a
//! response snapshot (any status) or a connection-level failure. Deciding
//! which statuses are failures is the pipeline's job.

pub mod http;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::request::{RequestDescriptor, ResponseSnapshot};

pub use self::http::HttpTransport;

/// Low-level failure of a single exchange. Kept as the nested cause of the
/// user-facing pipeline error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The upstream could not be reached at all.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The connection broke mid-exchange.
    #[error("I/O error: {0}")]
    Io(String),

    /// The request URL could not be resolved.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The upstream answered with an error status.
    #[error("upstream responded with status {status}")]
    Status { status: u16, body_len: usize },
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// "Make this HTTP request, get a response or error."
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: RequestDescriptor) -> BoxFuture<'static, Result<ResponseSnapshot, TransportError>>;
}
