//! Log setup.
//!
//! The terminal belongs to the UI, so logs go to a file.  Levels come from
//! `RUST_LOG` (default `info`):
//!
//! ```bash
//! RUST_LOG=wp_reader=debug wp-reader --log-file /tmp/wp-reader.log
//! ```

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.  Without a path nothing is installed and
/// every `tracing` macro is a no-op.
pub fn setup_tracing(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}
