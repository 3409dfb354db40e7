//! Request and response value types.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use url::Url;

/// Base used to parse relative URLs; never sent anywhere.
const RELATIVE_BASE: &str = "http://relative.invalid";

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Methods with side effects. These are never retried, cached or coalesced.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for methods the pipeline does not carry (CONNECT, TRACE, extensions).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = UnsupportedMethod;

    fn try_from(method: &http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Head => http::Method::HEAD,
            Method::Options => http::Method::OPTIONS,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
        }
    }
}

/// Identity of a request for caching and coalescing: method plus URL with
/// query parameters sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable outbound request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    private: bool,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            private: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Mark the request as scoped to one client. Private requests bypass the
    /// shared cache and are never coalesced with other callers.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// URL as supplied by the caller; absolute or origin-relative.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Parsed form of the URL. Relative URLs resolve against a placeholder origin.
    fn parsed(&self) -> Option<Url> {
        match Url::parse(&self.url) {
            Ok(url) => Some(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(RELATIVE_BASE).ok()?.join(&self.url).ok()
            }
            Err(_) => None,
        }
    }

    /// Path component, used by every endpoint rule.
    pub fn path(&self) -> String {
        match self.parsed() {
            Some(url) => url.path().to_string(),
            None => self.url.split(['?', '#']).next().unwrap_or_default().to_string(),
        }
    }

    /// URL normalized for identity: fragment dropped, query pairs sorted.
    pub fn normalized_url(&self) -> String {
        let Some(mut url) = self.parsed() else {
            return self.url.clone();
        };
        url.set_fragment(None);

        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if pairs.is_empty() {
            url.set_query(None);
        } else {
            pairs.sort();
            url.query_pairs_mut().clear().extend_pairs(pairs);
        }

        let absolute = self.url.starts_with("http://") || self.url.starts_with("https://");
        if absolute {
            url.to_string()
        } else {
            url[url::Position::BeforePath..].to_string()
        }
    }

    /// Deterministic cache/coalescing identity.
    pub fn key(&self) -> RequestKey {
        RequestKey(format!("{} {}", self.method, self.normalized_url()))
    }
}

/// Immutable snapshot of a received response.
#[derive(Debug, Clone)]
pub struct ResponseSnapshot {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl ResponseSnapshot {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Anything below 400 counts as a successful exchange, including 304.
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    pub fn etag(&self) -> Option<&str> {
        self.headers.get(http::header::ETAG)?.to_str().ok()
    }

    /// This stored response as confirmed by a 304 from upstream. Keeps the
    /// stored status and body and takes the ETag from the 304 if it sent one.
    pub fn revalidated(&self, not_modified: &ResponseSnapshot) -> ResponseSnapshot {
        let mut headers = self.headers.clone();
        if let Some(etag) = not_modified.headers.get(http::header::ETAG) {
            headers.insert(http::header::ETAG, etag.clone());
        }
        ResponseSnapshot {
            status: self.status,
            headers,
            body: self.body.clone(),
        }
    }

    /// Body size in bytes, used for metrics.
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_sorts_query_params() {
        let a = RequestDescriptor::get("/api/hoteles?ciudad=Bogota&estrellas=4");
        let b = RequestDescriptor::get("/api/hoteles?estrellas=4&ciudad=Bogota");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "GET /api/hoteles?ciudad=Bogota&estrellas=4");
    }

    #[test]
    fn test_key_includes_method() {
        let get = RequestDescriptor::get("/api/reservas");
        let post = RequestDescriptor::post("/api/reservas", "{}");
        assert_ne!(get.key(), post.key());
    }

    #[test]
    fn test_absolute_url_key() {
        let req = RequestDescriptor::get("https://api.example.com/api/hoteles?b=2&a=1#top");
        assert_eq!(req.key().as_str(), "GET https://api.example.com/api/hoteles?a=1&b=2");
        assert_eq!(req.path(), "/api/hoteles");
    }

    #[test]
    fn test_path_of_relative_url() {
        let req = RequestDescriptor::get("/api/disponibilidad?ciudad=Bogota");
        assert_eq!(req.path(), "/api/disponibilidad");
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert!("TRACE".parse::<Method>().is_err());
        assert!(Method::Delete.is_mutation());
        assert!(!Method::Head.is_mutation());
    }

    #[test]
    fn test_revalidated_keeps_stored_body() {
        let mut stored_headers = HeaderMap::new();
        stored_headers.insert(http::header::ETAG, http::HeaderValue::from_static("\"v1\""));
        let stored = ResponseSnapshot::new(200, stored_headers, r#"{"id":3}"#);

        let mut headers = HeaderMap::new();
        headers.insert(http::header::ETAG, http::HeaderValue::from_static("\"v2\""));
        let not_modified = ResponseSnapshot::new(304, headers, Bytes::new());

        let confirmed = stored.revalidated(&not_modified);
        assert_eq!(confirmed.status(), 200);
        assert_eq!(confirmed.body().as_ref(), br#"{"id":3}"#);
        assert_eq!(confirmed.etag(), Some("\"v2\""));

        let unchanged = stored.revalidated(&ResponseSnapshot::new(304, HeaderMap::new(), Bytes::new()));
        assert_eq!(unchanged.etag(), Some("\"v1\""));
    }

    #[test]
    fn test_private_does_not_change_key() {
        let shared = RequestDescriptor::get("/api/usuarios/me");
        let private = RequestDescriptor::get("/api/usuarios/me").private();
        assert!(private.is_private());
        assert!(!shared.is_private());
        assert_eq!(shared.key(), private.key());
    }

    #[test]
    fn test_response_success_range() {
        assert!(ResponseSnapshot::new(304, HeaderMap::new(), Bytes::new()).is_success());
        assert!(!ResponseSnapshot::new(404, HeaderMap::new(), Bytes::new()).is_success());
    }
}
