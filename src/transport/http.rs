//! reqwest-backed transport.

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use url::Url;

use crate::config::UpstreamConfig;
use crate::request::{RequestDescriptor, ResponseSnapshot};
use crate::transport::{Transport, TransportError};

/// Sends requests over HTTP, resolving relative URLs against the upstream base.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &UpstreamConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        // Compression is negotiated by the optimizer's Accept-Encoding; bodies
        // are passed through as received.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .no_proxy()
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::info!(base_url = %base_url, "HTTP transport initialized");
        Ok(Self { client, base_url })
    }

    /// Absolute URLs are used as-is; anything else is joined onto the base.
    pub fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base_url
                .join(url)
                .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e))),
            Err(e) => Err(TransportError::InvalidUrl(format!("{}: {}", url, e))),
        }
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Io(error.to_string())
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: RequestDescriptor) -> BoxFuture<'static, Result<ResponseSnapshot, TransportError>> {
        let client = self.client.clone();
        let url = self.resolve(request.url());

        async move {
            let url = url?;
            let mut builder = client
                .request(request.method().into(), url)
                .headers(request.headers().clone());
            if let Some(body) = request.body() {
                builder = builder.body(body.clone());
            }

            let response = builder.send().await.map_err(classify)?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(classify)?;

            Ok(ResponseSnapshot::new(status, headers, body))
        }
        .boxed()
    }
}
