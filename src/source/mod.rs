//! Transport abstraction layer.
//!
//! This module defines the [`Transport`] trait, the only way the engine talks
//! to the network, plus the domain records every payload is converted into.
//! The concrete HTTP implementation lives in [`http`].
//!
//! ## For contributors — swapping the transport
//!
//! 1. Implement [`Transport`] for your type (a proxy, a recording fake, a
//!    different HTTP client).
//! 2. Hand it to [`PageFetcher`](crate::fetcher::PageFetcher) and
//!    [`ResourceCache`](crate::cache::ResourceCache) as an `Arc<dyn Transport>`.
//!
//! Nothing above this layer opens sockets.

pub mod http;
pub(crate) mod record;

pub use http::HttpTransport;
pub use record::{Location, Post};

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;

/// One GET request.  Always idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    /// Value of the `Accept` header.
    pub accept: &'static str,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Request {
    /// A JSON request with the given timeouts.
    pub fn json(url: impl Into<String>, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            accept: "application/json",
            connect_timeout,
            read_timeout,
        }
    }

    /// A request for an arbitrary binary resource.
    pub fn binary(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            accept: "*/*",
            connect_timeout: timeout,
            read_timeout: timeout,
        }
    }
}

/// Whatever the server sent back, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait every transport must implement.
///
/// Fetches run on tokio worker tasks, so implementations must be
/// `Send + Sync`.  A non-2xx status is *not* an error at this level; it comes
/// back as a [`Response`] and the caller decides what it means.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &Request) -> Result<Response, TransportError>;
}

// ---------------------------------------------------------------------------
// Test fake
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod fake {
    //! A scripted transport for unit tests.

    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::sync::watch;

    use super::*;

    type Reply = Result<Response, TransportError>;

    /// Returns canned replies keyed by URL and counts every call.
    ///
    /// When [`hold`](FakeTransport::hold) is set, each call parks until
    /// [`release`](FakeTransport::release) is called, which lets tests fire
    /// triggers while a fetch is in flight.
    #[derive(Default)]
    pub struct FakeTransport {
        replies: Mutex<HashMap<String, VecDeque<Reply>>>,
        fallback: Mutex<Option<Reply>>,
        requested: Mutex<Vec<String>>,
        calls: AtomicUsize,
        gate: Mutex<Option<watch::Sender<bool>>>,
    }

    impl FakeTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Queue a reply for `url`; queued replies are consumed in order.
        pub fn reply(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
            self.push(
                url,
                Ok(Response {
                    status,
                    body: body.into(),
                }),
            );
        }

        pub fn fail(&self, url: &str, err: TransportError) {
            self.push(url, Err(err));
        }

        /// Reply used for any URL with nothing queued.
        pub fn fallback(&self, status: u16, body: impl Into<Vec<u8>>) {
            *self.fallback.lock().unwrap() = Some(Ok(Response {
                status,
                body: body.into(),
            }));
        }

        fn push(&self, url: &str, reply: Reply) {
            self.replies
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default()
                .push_back(reply);
        }

        /// Park every subsequent call until [`release`](Self::release).
        pub fn hold(&self) {
            let (tx, _) = watch::channel(false);
            *self.gate.lock().unwrap() = Some(tx);
        }

        /// Stop parking and wake everything currently parked.
        pub fn release(&self) {
            if let Some(gate) = self.gate.lock().unwrap().take() {
                gate.send_replace(true);
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(&self, request: &Request) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(request.url.clone());

            let gate = self.gate.lock().unwrap().as_ref().map(|tx| tx.subscribe());
            if let Some(mut gate) = gate {
                let _ = gate.wait_for(|open| *open).await;
            }

            let queued = self
                .replies
                .lock()
                .unwrap()
                .get_mut(&request.url)
                .and_then(|q| q.pop_front());
            match queued {
                Some(reply) => reply,
                None => self
                    .fallback
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or_else(|| Err(TransportError::Other(format!("no reply for {}", request.url)))),
            }
        }
    }
}
