//! Outbound header optimization.
//!
//! Each rule is applied independently and only fills in headers the caller
//! did not set. The static-asset `Cache-Control` is a hint for the transport
//! and intermediaries; it does not affect the pipeline's own cache.

use http::header::{self, HeaderValue};

use crate::cache::validators::ValidatorStore;
use crate::config::OptimizerConfig;
use crate::request::descriptor::{Method, RequestDescriptor};
use crate::routing::has_extension;

/// Return a copy of `request` with compression, accept-type, cache-control
/// and conditional-request headers filled in.
pub fn optimize(
    request: RequestDescriptor,
    config: &OptimizerConfig,
    validators: &dyn ValidatorStore,
) -> RequestDescriptor {
    let path = request.path();
    let is_api = path.starts_with(&config.api_prefix);
    let is_get = request.method() == Method::Get;

    let mut headers = request.headers().clone();

    if !headers.contains_key(header::ACCEPT_ENCODING) {
        set(&mut headers, header::ACCEPT_ENCODING, &config.accept_encoding);
    }

    if !headers.contains_key(header::ACCEPT) {
        if is_api {
            set(&mut headers, header::ACCEPT, &config.json_accept);
        } else if has_extension(&path, &config.image_extensions) {
            set(&mut headers, header::ACCEPT, &config.image_accept);
        }
    }

    if is_get
        && has_extension(&path, &config.static_asset_extensions)
        && !headers.contains_key(header::CACHE_CONTROL)
    {
        set(&mut headers, header::CACHE_CONTROL, &config.static_cache_control);
    }

    if is_get && is_api && !headers.contains_key(header::IF_NONE_MATCH) {
        if let Some(token) = validators.get(&request.normalized_url()) {
            set(&mut headers, header::IF_NONE_MATCH, &token);
        }
    }

    request.with_headers(headers)
}

fn set(headers: &mut http::HeaderMap, name: header::HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::debug!(header = %name, "Skipping header with invalid value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::validators::MemoryValidatorStore;

    fn run(request: RequestDescriptor, validators: &MemoryValidatorStore) -> RequestDescriptor {
        optimize(request, &OptimizerConfig::default(), validators)
    }

    fn header_value<'a>(request: &'a RequestDescriptor, name: header::HeaderName) -> Option<&'a str> {
        request.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_api_get_gets_json_and_compression() {
        let req = run(RequestDescriptor::get("/api/hoteles"), &MemoryValidatorStore::default());
        assert_eq!(header_value(&req, header::ACCEPT), Some("application/json"));
        assert_eq!(header_value(&req, header::ACCEPT_ENCODING), Some("gzip, deflate, br"));
        assert!(header_value(&req, header::CACHE_CONTROL).is_none());
    }

    #[test]
    fn test_caller_headers_are_kept() {
        let req = RequestDescriptor::get("/api/hoteles")
            .with_header(header::ACCEPT, HeaderValue::from_static("text/csv"))
            .with_header(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        let req = run(req, &MemoryValidatorStore::default());
        assert_eq!(header_value(&req, header::ACCEPT), Some("text/csv"));
        assert_eq!(header_value(&req, header::ACCEPT_ENCODING), Some("identity"));
    }

    #[test]
    fn test_static_image_asset() {
        let req = run(RequestDescriptor::get("/img/hotel-1.webp"), &MemoryValidatorStore::default());
        assert!(header_value(&req, header::ACCEPT).unwrap().starts_with("image/"));
        assert_eq!(
            header_value(&req, header::CACHE_CONTROL),
            Some("public, max-age=31536000, immutable")
        );
    }

    #[test]
    fn test_static_asset_cache_control_only_for_get() {
        let req = run(
            RequestDescriptor::post("/assets/app.js", "x"),
            &MemoryValidatorStore::default(),
        );
        assert!(header_value(&req, header::CACHE_CONTROL).is_none());
    }

    #[test]
    fn test_attaches_known_validator() {
        let validators = MemoryValidatorStore::default();
        validators.put("/api/usuarios?page=1", "\"etag-1\"");

        let req = run(RequestDescriptor::get("/api/usuarios?page=1"), &validators);
        assert_eq!(header_value(&req, header::IF_NONE_MATCH), Some("\"etag-1\""));

        let other = run(RequestDescriptor::get("/api/usuarios?page=2"), &validators);
        assert!(header_value(&other, header::IF_NONE_MATCH).is_none());

        let post = run(RequestDescriptor::post("/api/usuarios?page=1", "{}"), &validators);
        assert!(header_value(&post, header::IF_NONE_MATCH).is_none());
    }
}
