//! Conversion between axum requests/responses and pipeline types.

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, HeaderName, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::{ErrorKind, PipelineError};
use crate::request::{Method, RequestDescriptor, ResponseSnapshot};

/// Headers that describe one connection and are never forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name) || name.as_str() == "keep-alive"
}

/// Requests carrying client credentials get responses meant for that client
/// alone; they must not be shared through the cache or the registry.
fn carries_credentials(headers: &HeaderMap) -> bool {
    headers.contains_key(header::AUTHORIZATION) || headers.contains_key(header::COOKIE)
}

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !is_hop_by_hop(name) && *name != header::HOST {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
}

/// Build a descriptor from an inbound request, buffering at most
/// `max_body_bytes` of body.
pub async fn into_descriptor(
    request: Request<Body>,
    max_body_bytes: usize,
) -> Result<RequestDescriptor, Response> {
    let (parts, body) = request.into_parts();

    let method = Method::try_from(&parts.method).map_err(|e| {
        (StatusCode::METHOD_NOT_ALLOWED, e.to_string()).into_response()
    })?;

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let bytes = to_bytes(body, max_body_bytes).await.map_err(|e| {
        tracing::debug!(error = %e, limit = max_body_bytes, "Rejected request body");
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response()
    })?;

    let mut descriptor = RequestDescriptor::new(method, url).with_headers(forwardable(&parts.headers));
    if !bytes.is_empty() {
        descriptor = descriptor.with_body(bytes);
    }
    if carries_credentials(&parts.headers) {
        descriptor = descriptor.private();
    }
    Ok(descriptor)
}

/// Relay an upstream response to the client.
pub fn snapshot_response(snapshot: ResponseSnapshot) -> Response {
    let status = StatusCode::from_u16(snapshot.status()).unwrap_or(StatusCode::BAD_GATEWAY);
    let headers = forwardable(snapshot.headers());

    let mut response = Response::new(Body::from(snapshot.body().clone()));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Status code the gateway answers with for a failed dispatch.
pub fn error_status(error: &PipelineError) -> StatusCode {
    if let Some(status) = error.status().and_then(|s| StatusCode::from_u16(s).ok()) {
        return status;
    }
    match error.kind() {
        ErrorKind::NetworkUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(error: &PipelineError) -> Response {
    let body = ErrorBody {
        error: error.kind(),
        message: error.message().to_string(),
    };
    (error_status(error), Json(body)).into_response()
}
