//! Content-addressed resource cache with single-flight fetching.
//!
//! Keys are URLs; values are whatever a [`Decode`] implementation turns the
//! downloaded bytes into (for the reader, sniffed images).  The guarantees:
//!
//! * a hit never touches the network;
//! * concurrent misses for the same URL share one fetch, and every caller
//!   gets that fetch's outcome, success or failure;
//! * failures are not remembered, so the next request retries;
//! * the fetch runs on its own task and fills the cache even if every
//!   caller has gone away;
//! * [`clear`](ResourceCache::clear) empties the map, and fetches that were
//!   in flight at the time do not repopulate it.
//!
//! There is no size or age based eviction.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, trace, warn};

use crate::error::CacheError;
use crate::source::{Request, Transport};

/// Turns downloaded bytes into a cached value.
pub trait Decode: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Output, String>;
}

type Flight<V> = Shared<BoxFuture<'static, Result<Arc<V>, CacheError>>>;

enum Slot<V> {
    Ready(Arc<V>),
    Loading(Flight<V>),
}

struct State<V> {
    /// Bumped by `clear()`; fetches started under an older value are not
    /// written back.
    generation: u64,
    slots: HashMap<String, Slot<V>>,
}

struct Inner<D: Decode> {
    transport: Arc<dyn Transport>,
    decoder: D,
    timeout: Duration,
    state: Mutex<State<D::Output>>,
}

/// A shareable handle; clones refer to the same map.
pub struct ResourceCache<D: Decode> {
    inner: Arc<Inner<D>>,
}

impl<D: Decode> Clone for ResourceCache<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Decode> ResourceCache<D> {
    pub fn new(transport: Arc<dyn Transport>, decoder: D, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                decoder,
                timeout,
                state: Mutex::new(State {
                    generation: 0,
                    slots: HashMap::new(),
                }),
            }),
        }
    }

    /// Return the resource for `url`, fetching it at most once no matter how
    /// many callers ask concurrently.
    ///
    /// Must be called from inside a tokio runtime.
    pub async fn get(&self, url: &str) -> Result<Arc<D::Output>, CacheError> {
        let flight = {
            let mut state = self.inner.lock();
            match state.slots.get(url) {
                Some(Slot::Ready(value)) => {
                    trace!(url, "cache hit");
                    return Ok(Arc::clone(value));
                }
                Some(Slot::Loading(flight)) => {
                    trace!(url, "joining in-flight fetch");
                    flight.clone()
                }
                None => {
                    debug!(url, "cache miss");
                    let flight = self.launch(url.to_string(), state.generation);
                    state
                        .slots
                        .insert(url.to_string(), Slot::Loading(flight.clone()));
                    flight
                }
            }
        };
        flight.await
    }

    /// The cached value, if one is ready.  Never starts a fetch.
    pub fn peek(&self, url: &str) -> Option<Arc<D::Output>> {
        match self.inner.lock().slots.get(url) {
            Some(Slot::Ready(value)) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Number of ready entries.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.  Subsequent requests are fresh misses.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.generation += 1;
        state.slots.clear();
        debug!(generation = state.generation, "resource cache cleared");
    }

    /// Spawn the fetch for `url`.  Called with the state lock held, so the
    /// task cannot settle before its slot exists.
    fn launch(&self, url: String, generation: u64) -> Flight<D::Output> {
        let inner = Arc::clone(&self.inner);
        let task_url = url.clone();
        let handle = tokio::spawn(async move {
            let result = inner.fetch(&task_url).await;
            inner.settle(&task_url, generation, &result);
            result
        });

        let inner = Arc::clone(&self.inner);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(join) => {
                    let result = Err(CacheError::Aborted(join.to_string()));
                    inner.settle(&url, generation, &result);
                    result
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl<D: Decode> Inner<D> {
    fn lock(&self) -> MutexGuard<'_, State<D::Output>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self, url: &str) -> Result<Arc<D::Output>, CacheError> {
        let response = self
            .transport
            .get(&Request::binary(url, self.timeout))
            .await?;
        if !response.is_success() {
            return Err(CacheError::HttpStatus(response.status));
        }
        let value = self
            .decoder
            .decode(&response.body)
            .map_err(CacheError::Decode)?;
        Ok(Arc::new(value))
    }

    /// Replace the in-flight marker with the outcome: a ready entry on
    /// success, nothing on failure.
    fn settle(&self, url: &str, generation: u64, result: &Result<Arc<D::Output>, CacheError>) {
        let mut state = self.lock();
        if state.generation != generation {
            debug!(url, "cache cleared during fetch; result not stored");
            return;
        }
        match result {
            Ok(value) => {
                state
                    .slots
                    .insert(url.to_string(), Slot::Ready(Arc::clone(value)));
            }
            Err(err) => {
                warn!(url, error = %err, "resource fetch failed");
                state.slots.remove(url);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
        };
        f.write_str(name)
    }
}

/// An image whose container format has been recognised.  Pixels are left
/// for the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Accepts PNG, JPEG, GIF and WebP by magic number; anything else is a
/// decode failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl Decode for ImageDecoder {
    type Output = Image;

    fn decode(&self, bytes: &[u8]) -> Result<Image, String> {
        let format = if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            ImageFormat::Png
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ImageFormat::Jpeg
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            ImageFormat::Gif
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            ImageFormat::WebP
        } else {
            return Err(format!("unrecognised image data ({} bytes)", bytes.len()));
        };
        Ok(Image {
            format,
            bytes: bytes.to_vec(),
        })
    }
}

/// The cache the reader uses for featured images.
pub type ImageCache = ResourceCache<ImageDecoder>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
