//! User-facing failure taxonomy.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::transport::TransportError;

/// Cause-based classification of a failed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// The upstream could not be reached at all.
    NetworkUnavailable,
    /// The request itself was rejected (4xx not covered below).
    InvalidRequest,
    /// Session missing or invalid. Callers end the session.
    Unauthorized,
    /// Authenticated but not permitted.
    Forbidden,
    NotFound,
    /// Upstream backpressure. Not retried here.
    RateLimited,
    /// 5xx class.
    ServerError,
    /// The dispatch deadline passed.
    Timeout,
    /// This caller stopped waiting. The dispatch itself may still complete.
    Cancelled,
}

impl ErrorKind {
    fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::NetworkUnavailable => {
                "Unable to reach the server. Check your connection and try again."
            }
            ErrorKind::InvalidRequest => "The request was rejected as invalid.",
            ErrorKind::Unauthorized => "Your session has expired. Please sign in again.",
            ErrorKind::Forbidden => "You do not have permission to perform this action.",
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::RateLimited => "Too many requests. Please wait a moment and try again.",
            ErrorKind::ServerError => "The server encountered an error. Please try again later.",
            ErrorKind::Timeout => "The request took too long to complete.",
            ErrorKind::Cancelled => "The request was cancelled.",
        }
    }
}

/// A failed dispatch as surfaced to callers. Cloneable so every caller
/// attached to one in-flight dispatch receives the same value.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    #[source]
    cause: Option<Arc<TransportError>>,
}

impl PipelineError {
    fn new(kind: ErrorKind, status: Option<u16>, cause: Option<TransportError>) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
            status,
            cause: cause.map(Arc::new),
        }
    }

    /// Map a low-level failure onto the taxonomy, keeping it as the cause.
    pub fn from_transport(failure: TransportError) -> Self {
        let status = failure.status();
        let kind = match &failure {
            TransportError::Connect(_) | TransportError::Io(_) => ErrorKind::NetworkUnavailable,
            TransportError::InvalidUrl(_) => ErrorKind::InvalidRequest,
            TransportError::Status { status, .. } => match status {
                401 => ErrorKind::Unauthorized,
                403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                429 => ErrorKind::RateLimited,
                500..=599 => ErrorKind::ServerError,
                _ => ErrorKind::InvalidRequest,
            },
        };
        Self::new(kind, status, Some(failure))
    }

    pub fn timeout(after: Duration) -> Self {
        let mut error = Self::new(ErrorKind::Timeout, None, None);
        error.message = format!("{} (limit {} ms)", error.message, after.as_millis());
        error
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, None, None)
    }

    /// The dispatch task ended without producing an outcome (panic or abort).
    pub(crate) fn aborted() -> Self {
        Self::new(ErrorKind::ServerError, None, None)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status received from upstream, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn cause(&self) -> Option<&TransportError> {
        self.cause.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn from_status(status: u16) -> PipelineError {
        PipelineError::from_transport(TransportError::Status { status, body_len: 0 })
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(from_status(400).kind(), ErrorKind::InvalidRequest);
        assert_eq!(from_status(401).kind(), ErrorKind::Unauthorized);
        assert_eq!(from_status(403).kind(), ErrorKind::Forbidden);
        assert_eq!(from_status(404).kind(), ErrorKind::NotFound);
        assert_eq!(from_status(422).kind(), ErrorKind::InvalidRequest);
        assert_eq!(from_status(429).kind(), ErrorKind::RateLimited);
        assert_eq!(from_status(500).kind(), ErrorKind::ServerError);
        assert_eq!(from_status(503).kind(), ErrorKind::ServerError);
    }

    #[test]
    fn test_network_mapping_keeps_cause() {
        let err = PipelineError::from_transport(TransportError::Connect("refused".into()));
        assert_eq!(err.kind(), ErrorKind::NetworkUnavailable);
        assert_eq!(err.status(), None);
        assert_eq!(err.source().unwrap().to_string(), "connection failed: refused");
    }

    #[test]
    fn test_human_readable_messages() {
        assert_eq!(
            from_status(401).to_string(),
            "Your session has expired. Please sign in again."
        );
        assert_eq!(
            PipelineError::timeout(Duration::from_secs(10)).to_string(),
            "The request took too long to complete. (limit 10000 ms)"
        );
        assert!(PipelineError::timeout(Duration::from_secs(1)).source().is_none());
    }
}
