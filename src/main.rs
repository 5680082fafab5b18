//! wp-reader — a terminal reader for WordPress posts with infinite scroll.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────────┐ AppMsg    ┌──────────┐  draw()  ┌──────────┐
//! │ background.rs│ ────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (tokio tasks)│           │ (state)  │          │ (render) │
//! └──────────────┘           └──────────┘          └──────────┘
//!                              ▲      ▲
//!                    ListEvent │      │ handle_key_event()
//!                     ┌──────────┐  ┌──────────┐
//!                     │  Pager   │  │ input.rs │
//!                     └──────────┘  └──────────┘
//! ```
//!
//! * **`config`** — command-line flags.
//! * **`logging`** — tracing to a file; the terminal belongs to the UI.
//! * **`background`** — location list and image loads on tokio tasks.
//! * **`app`** — owns view state (mirrored list, selection, status).
//! * **`ui`** — pure rendering: reads `App` state and draws widgets.
//! * **`input`** — maps key events to `App` mutations and engine actions.
//! * **`main`** — wires everything together and runs the event loop.

mod app;
mod background;
mod config;
mod input;
mod logging;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use wp_reader::cache::{ImageCache, ImageDecoder};
use wp_reader::fetcher::{FilterContext, PageFetcher};
use wp_reader::pager::{Pager, Trigger};
use wp_reader::prefs::{FileSelectionStore, MemorySelectionStore, SelectionStore};
use wp_reader::source::{HttpTransport, Location, Transport};

use app::App;
use background::AppMsg;
use config::Config;
use input::Action;

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Context switching
// ---------------------------------------------------------------------------

/// Everything the event loop drives besides the view.
struct Engine {
    pager: Pager,
    images: ImageCache,
    store: Box<dyn SelectionStore>,
    msg_tx: mpsc::UnboundedSender<AppMsg>,
    /// Persisted location waiting for the location list to confirm it.
    pending_restore: Option<i64>,
}

impl Engine {
    /// Every explicit switch supersedes a restore still waiting on the
    /// location list.
    fn show(&mut self, app: &mut App, context: FilterContext) {
        self.pending_restore = None;
        app.begin_context(Some(context));
        if let Trigger::Ignored(reason) = self.pager.activate(context) {
            warn!(%context, ?reason, "first page not requested");
        }
    }

    fn select_location(&mut self, app: &mut App, id: i64) {
        self.show(app, FilterContext::Location(id));
        if let Err(e) = self.store.set_selected_location(id) {
            warn!("could not persist selection: {e}");
        }
    }

    fn select_all(&mut self, app: &mut App) {
        self.show(app, FilterContext::All);
        if let Err(e) = self.store.clear_selected_location() {
            warn!("could not clear selection: {e}");
        }
    }

    fn locations_loaded(&mut self, app: &mut App, locations: Vec<Location>) {
        app.set_locations(locations);
        let Some(id) = self.pending_restore.take() else {
            return;
        };
        if app.location_name(id).is_some() {
            info!(id, "restoring saved location");
            self.show(app, FilterContext::Location(id));
        } else {
            warn!(id, "saved location no longer exists");
            if let Err(e) = self.store.clear_selected_location() {
                warn!("could not clear selection: {e}");
            }
        }
    }

    fn handle(&mut self, msg: AppMsg, app: &mut App) {
        match msg {
            AppMsg::Locations(Ok(locations)) => self.locations_loaded(app, locations),
            AppMsg::Locations(Err(e)) => {
                warn!("location list failed: {e}");
                app.status = format!("Error loading locations: {e}");
            }
            AppMsg::Image { url, result } => {
                let status = match result {
                    Ok((format, size)) => app::ImageStatus::Ready { format, size },
                    Err(e) => {
                        warn!(%url, "image failed: {e}");
                        app::ImageStatus::Failed(e.to_string())
                    }
                };
                app.images.insert(url, status);
            }
        }
    }

    fn act(&mut self, action: Action, app: &mut App) {
        match action {
            Action::None => {}
            Action::Scrolled(window) => {
                if let Trigger::Started { page } = self.pager.on_scroll(window) {
                    app.loading = true;
                    app.status = format!("Loading page {page}…");
                }
            }
            Action::Refresh => {
                app.retry_failed_images();
                if app.context.is_some() {
                    if let Trigger::Started { .. } = self.pager.refresh() {
                        app.loading = true;
                        app.status = "Loading posts…".into();
                    }
                }
            }
            Action::NextLocation => match app.next_location().map(|l| l.id) {
                Some(id) => self.select_location(app, id),
                None => app.status = "No locations available".into(),
            },
            Action::AllPosts => self.select_all(app),
        }
    }

    fn request_image(&self, app: &mut App) {
        if let Some(url) = app.image_to_request() {
            background::spawn_image(self.images.clone(), url, self.msg_tx.clone());
        }
    }
}

fn open_store(config: &Config) -> Box<dyn SelectionStore> {
    match config.prefs.clone().or_else(FileSelectionStore::default_path) {
        Some(path) => {
            let store = FileSelectionStore::new(path);
            info!(path = %store.path().display(), "selection store");
            Box::new(store)
        }
        None => {
            warn!("no config directory; selection will not be saved");
            Box::new(MemorySelectionStore::default())
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let config = Config::parse();
    logging::setup_tracing(config.log_file.as_deref())?;
    install_panic_hook();

    // Network work runs on the runtime; the UI loop stays on this thread.
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let _enter = runtime.enter();

    let fetch_config = config.fetch_config();
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(fetch_config.connect_timeout)?);
    let fetcher = Arc::new(PageFetcher::new(transport.clone(), fetch_config));
    info!(site = %fetcher.config().base_url, "starting");
    let (pager, mut list_rx) = Pager::new(fetcher.clone(), config.page_size, config.lookahead);
    let images = ImageCache::new(transport, ImageDecoder, config.image_timeout());
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();

    background::spawn_locations(fetcher, msg_tx.clone());

    let mut engine = Engine {
        pager,
        images,
        store: open_store(&config),
        msg_tx,
        pending_restore: None,
    };
    let mut app = App::new();

    if config.all {
        engine.select_all(&mut app);
    } else if let Some(id) = config.location {
        engine.select_location(&mut app, id);
    } else {
        engine.pending_restore = engine.store.selected_location();
        app.begin_context(None);
    }

    let mut guard = TerminalGuard::new()?;

    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Drain pager events and background messages.
    //   2. Render the UI.
    //   3. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(event) = list_rx.try_recv() {
            app.apply_list_event(&event, engine.pager.snapshot());
        }
        while let Ok(msg) = msg_rx.try_recv() {
            engine.handle(msg, &mut app);
        }
        engine.request_image(&mut app);

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                let action = input::handle_key_event(&mut app, key);
                engine.act(action, &mut app);
            }
        }

        if app.quit {
            break;
        }
    }

    engine.pager.deactivate();
    info!("exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wp_reader::error::TransportError;
    use wp_reader::fetcher::FetchConfig;
    use wp_reader::source::{Request, Response};

    use crate::app::tests::make_location;

    /// Answers every request with an empty list.
    struct EmptySite;

    #[async_trait]
    impl Transport for EmptySite {
        async fn get(&self, _request: &Request) -> Result<Response, TransportError> {
            Ok(Response {
                status: 200,
                body: b"[]".to_vec(),
            })
        }
    }

    fn engine(saved: Option<i64>) -> Engine {
        let transport: Arc<dyn Transport> = Arc::new(EmptySite);
        let fetcher = Arc::new(PageFetcher::new(
            transport.clone(),
            FetchConfig::new("https://site.test", "ds/v1"),
        ));
        let (pager, _events) = Pager::new(fetcher, 10, 2);
        let store = MemorySelectionStore::default();
        if let Some(id) = saved {
            store.set_selected_location(id).unwrap();
        }
        let (msg_tx, _msgs) = mpsc::unbounded_channel();
        Engine {
            pager,
            images: ImageCache::new(transport, ImageDecoder, Duration::from_secs(1)),
            store: Box::new(store),
            msg_tx,
            pending_restore: saved,
        }
    }

    #[tokio::test]
    async fn saved_location_is_restored_when_it_exists() {
        let mut engine = engine(Some(5));
        let mut app = App::new();
        engine.locations_loaded(&mut app, vec![make_location(5, "Hall")]);
        assert_eq!(app.context, Some(FilterContext::Location(5)));
        assert_eq!(engine.pager.context(), Some(FilterContext::Location(5)));
    }

    #[tokio::test]
    async fn stale_saved_location_is_cleared() {
        let mut engine = engine(Some(9));
        let mut app = App::new();
        engine.locations_loaded(&mut app, vec![make_location(5, "Hall")]);
        assert_eq!(app.context, None);
        assert_eq!(engine.store.selected_location(), None);
    }

    #[tokio::test]
    async fn choosing_all_before_locations_arrive_wins_over_restore() {
        let mut engine = engine(Some(5));
        let mut app = App::new();
        engine.select_all(&mut app);
        engine.locations_loaded(&mut app, vec![make_location(5, "Hall")]);

        assert_eq!(app.context, Some(FilterContext::All));
        assert_eq!(engine.pager.context(), Some(FilterContext::All));
        assert_eq!(engine.store.selected_location(), None);
    }

    #[tokio::test]
    async fn choosing_a_location_before_locations_arrive_wins_over_restore() {
        let mut engine = engine(Some(5));
        let mut app = App::new();
        engine.select_location(&mut app, 7);
        engine.locations_loaded(
            &mut app,
            vec![make_location(5, "Hall"), make_location(7, "Library")],
        );

        assert_eq!(app.context, Some(FilterContext::Location(7)));
        assert_eq!(engine.store.selected_location(), Some(7));
    }
}
