//! HTTP transport implementation.
//!
//! Wraps a single [`reqwest::Client`] and maps its failures onto
//! [`TransportError`].  Status codes are passed through untouched; deciding
//! what a 404 or a 500 means is the fetcher's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::debug;

use super::{Request, Response, Transport};
use crate::error::TransportError;

/// A [`Transport`] backed by [`reqwest`].
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose connections give up after `connect_timeout`.
    ///
    /// The read timeout is applied per request, so one client can serve both
    /// JSON pages and slower image downloads.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("wp-reader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &Request) -> Result<Response, TransportError> {
        debug!(url = %request.url, "GET");

        let response = self
            .client
            .get(&request.url)
            .header(ACCEPT, request.accept)
            .timeout(request.connect_timeout + request.read_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        debug!(url = %request.url, status, len = body.len(), "response");

        Ok(Response {
            status,
            body: body.to_vec(),
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_custom_timeout() {
        assert!(HttpTransport::new(Duration::from_millis(250)).is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let transport = HttpTransport::new(Duration::from_millis(200)).unwrap();
        // Nothing listens on the discard port.
        let req = Request::json(
            "http://127.0.0.1:9/wp-json/wp/v2/posts",
            Duration::from_millis(200),
            Duration::from_millis(200),
        );
        let err = transport.get(&req).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connect(_) | TransportError::Timeout(_) | TransportError::Other(_)
        ));
    }
}
