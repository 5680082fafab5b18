//! One-shot background jobs.
//!
//! Page fetches are owned by the [`Pager`](wp_reader::pager::Pager); the
//! other two kinds of network work, the location list and featured images,
//! run here on tokio tasks and report back to the UI thread over an
//! [`mpsc`] channel that the main loop drains every tick.

use std::sync::Arc;

use tokio::sync::mpsc;

use wp_reader::cache::{ImageCache, ImageFormat};
use wp_reader::error::{CacheError, FetchError};
use wp_reader::fetcher::PageFetcher;
use wp_reader::source::Location;

/// Messages sent from background tasks to the UI thread.
#[derive(Debug)]
pub enum AppMsg {
    /// The location list finished loading.
    Locations(Result<Vec<Location>, FetchError>),
    /// A featured image finished loading.
    Image {
        url: String,
        result: Result<(ImageFormat, usize), CacheError>,
    },
}

/// Fetch the location list once.
pub fn spawn_locations(fetcher: Arc<PageFetcher>, tx: mpsc::UnboundedSender<AppMsg>) {
    tokio::spawn(async move {
        let result = fetcher.fetch_locations().await.map(|page| page.records);
        // If the receiver is gone the UI has exited.
        let _ = tx.send(AppMsg::Locations(result));
    });
}

/// Resolve one image through the cache.  Concurrent requests for the same
/// URL share a single download.
pub fn spawn_image(cache: ImageCache, url: String, tx: mpsc::UnboundedSender<AppMsg>) {
    tokio::spawn(async move {
        let result = cache
            .get(&url)
            .await
            .map(|image| (image.format, image.bytes.len()));
        let _ = tx.send(AppMsg::Image { url, result });
    });
}
