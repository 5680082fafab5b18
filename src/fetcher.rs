//! Page fetcher: one paginated request against the transport.
//!
//! The fetcher builds the URL, applies the configured timeouts, maps failure
//! modes onto [`FetchError`], and hands successful bodies to the parser.  It
//! keeps no state between calls.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{FetchError, RecordSkipped};
use crate::parse::{self, Parsed};
use crate::source::{Location, Post, Request, Transport};

/// Longest server message kept on an [`FetchError::HttpStatus`].
const MAX_SERVER_MESSAGE: usize = 200;

/// Which feed a list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterContext {
    /// The site-wide `wp/v2/posts` feed.
    All,
    /// Posts scoped to one location.
    Location(i64),
}

impl fmt::Display for FilterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterContext::All => write!(f, "all"),
            FilterContext::Location(id) => write!(f, "location {id}"),
        }
    }
}

/// Endpoints and timeouts.  Built from the command line in the binary and
/// by hand in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Site root; `/wp-json/...` is appended to it.
    pub base_url: String,
    /// REST namespace of the location endpoints, e.g. `ds/v1`.
    pub namespace: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl FetchConfig {
    pub fn new(base_url: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            namespace: namespace.into(),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
        }
    }

    fn api_root(&self) -> String {
        format!("{}/wp-json", self.base_url.trim_end_matches('/'))
    }

    fn namespace(&self) -> &str {
        self.namespace.trim_matches('/')
    }
}

/// One fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The page number that was requested.
    pub page: u32,
    pub records: Vec<T>,
    /// Records the parser had to drop.  Not a failure.
    pub warnings: Vec<RecordSkipped>,
}

impl<T> Page<T> {
    fn from_parsed(page: u32, parsed: Parsed<T>) -> Self {
        Self {
            page,
            records: parsed.records,
            warnings: parsed.warnings,
        }
    }

    /// Entries the server sent, including ones the parser dropped.
    pub fn returned(&self) -> usize {
        self.records.len() + self.warnings.len()
    }

    /// A full page means the server may have more.  This is the only
    /// continuation signal; total-count headers are ignored.
    pub fn is_full(&self, page_size: u32) -> bool {
        self.returned() == page_size as usize
    }
}

/// Issues page requests for posts and the one-shot location request.
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    config: FetchConfig,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn Transport>, config: FetchConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// URL of one page of posts for `context`.
    pub fn posts_url(&self, context: &FilterContext, page: u32, page_size: u32) -> String {
        let root = self.config.api_root();
        let path = match context {
            FilterContext::All => format!("{root}/wp/v2/posts"),
            FilterContext::Location(id) => {
                format!("{root}/{}/locations/{id}/posts", self.config.namespace())
            }
        };
        format!("{path}?per_page={page_size}&page={page}")
    }

    pub fn locations_url(&self) -> String {
        format!("{}/{}/locations", self.config.api_root(), self.config.namespace())
    }

    /// Fetch and decode one page of posts.
    pub async fn fetch_page(
        &self,
        context: &FilterContext,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Post>, FetchError> {
        let url = self.posts_url(context, page, page_size);
        let body = self.get(&url).await?;
        let parsed = parse::parse_posts(&body)?;
        if !parsed.warnings.is_empty() {
            warn!(%context, page, skipped = parsed.warnings.len(), "page had malformed records");
        }
        debug!(%context, page, count = parsed.records.len(), "page decoded");
        Ok(Page::from_parsed(page, parsed))
    }

    /// Fetch the full location list.  The endpoint is not paginated; the
    /// result is reported as page 1.
    pub async fn fetch_locations(&self) -> Result<Page<Location>, FetchError> {
        let url = self.locations_url();
        let body = self.get(&url).await?;
        let parsed = parse::parse_locations(&body)?;
        debug!(count = parsed.records.len(), "locations decoded");
        Ok(Page::from_parsed(1, parsed))
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request = Request::json(url, self.config.connect_timeout, self.config.read_timeout);
        let response = self.transport.get(&request).await?;

        if !response.is_success() {
            let message = server_message(&response.body);
            warn!(url, status = response.status, %message, "HTTP error");
            return Err(FetchError::HttpStatus {
                status: response.status,
                message,
            });
        }
        Ok(response.body)
    }
}

fn server_message(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "No error details".to_string();
    }
    text.chars().take(MAX_SERVER_MESSAGE).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
