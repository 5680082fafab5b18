//! Command-line configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use wp_reader::fetcher::FetchConfig;
use wp_reader::pager::{DEFAULT_LOOKAHEAD, DEFAULT_PAGE_SIZE};

const DEFAULT_BASE_URL: &str = "https://www.dandysite.com/yycd/yycd";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "wp-reader",
    version,
    about = "Browse a WordPress site's posts in the terminal, optionally filtered by location"
)]
pub struct Config {
    /// Site root; `/wp-json` is appended to it
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// REST namespace serving the location endpoints
    #[arg(long, default_value = "ds/v1")]
    pub namespace: String,

    /// Posts requested per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub page_size: u32,

    #[arg(long, default_value_t = 10_000)]
    pub connect_timeout_ms: u64,

    #[arg(long, default_value_t = 10_000)]
    pub read_timeout_ms: u64,

    /// Timeout for featured image downloads
    #[arg(long, default_value_t = 5_000)]
    pub image_timeout_ms: u64,

    /// Load the next page once the view is this many items from the end
    #[arg(long, default_value_t = DEFAULT_LOOKAHEAD)]
    pub lookahead: usize,

    /// Start with this location selected (and remember it)
    #[arg(long, conflicts_with = "all")]
    pub location: Option<i64>,

    /// Start with the site-wide feed instead of a location
    #[arg(long)]
    pub all: bool,

    /// Where the selected location is remembered
    #[arg(long)]
    pub prefs: Option<PathBuf>,

    /// Write logs here (filtered by RUST_LOG); logging is off otherwise
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            ..FetchConfig::new(&self.base_url, &self.namespace)
        }
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }
}
