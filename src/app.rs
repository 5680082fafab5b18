//! Application state for the terminal front end.
//!
//! [`App`] mirrors the pager's list and adds what only the view cares about:
//! the selection, the location list, status text, and per-image load state.
//! It never mutates the pager's list; it is refreshed from a
//! [`ListSnapshot`] whenever a [`ListEvent`] arrives.

use std::collections::HashMap;

use ratatui::widgets::ListState;

use wp_reader::cache::ImageFormat;
use wp_reader::fetcher::FilterContext;
use wp_reader::pager::{ListEvent, ListSnapshot, ScrollWindow};
use wp_reader::source::{Location, Post};

/// Load state of one featured image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    Loading,
    Ready { format: ImageFormat, size: usize },
    Failed(String),
}

pub struct App {
    /// Posts of the active context, in list order.
    pub items: Vec<Post>,
    /// List selection and scroll offset.
    pub list_state: ListState,
    pub locations: Vec<Location>,
    /// Active feed; `None` shows the welcome screen.
    pub context: Option<FilterContext>,
    pub loading: bool,
    pub has_more: bool,
    /// Set when the first page failed and there is nothing to show.
    pub error: Option<String>,
    pub images: HashMap<String, ImageStatus>,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last status message.
    pub status: String,
    /// Rows available to the list, updated on every draw.
    pub viewport: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            list_state: ListState::default(),
            locations: Vec::new(),
            context: None,
            loading: false,
            has_more: true,
            error: None,
            images: HashMap::new(),
            quit: false,
            status: "Starting…".into(),
            viewport: 0,
        }
    }

    // -- list sync -----------------------------------------------------------

    /// A new context was activated: clear the mirror until page 1 lands.
    pub fn begin_context(&mut self, context: Option<FilterContext>) {
        self.context = context;
        self.items.clear();
        self.list_state = ListState::default();
        self.error = None;
        self.has_more = true;
        self.loading = context.is_some();
        self.status = match context {
            Some(_) => "Loading posts…".into(),
            None => "Select a location".into(),
        };
    }

    fn sync(&mut self, snapshot: ListSnapshot) {
        self.items = snapshot.items;
        self.has_more = snapshot.has_more;
        self.loading = snapshot.loading;
    }

    /// Fold one pager event into the view.  Events for a context the view
    /// has already left are ignored.
    pub fn apply_list_event(&mut self, event: &ListEvent, snapshot: ListSnapshot) {
        if Some(event.context()) != self.context || snapshot.context != self.context {
            return;
        }
        self.sync(snapshot);

        match event {
            ListEvent::ItemsReplaced { count, .. } => {
                self.error = None;
                self.list_state = ListState::default();
                if *count == 0 {
                    self.status = "No posts found".into();
                } else {
                    self.list_state.select(Some(0));
                    self.status = format!("Loaded {count} posts");
                }
            }
            ListEvent::ItemsAppended { range, .. } => {
                self.status = if !self.has_more {
                    "No more posts to load".into()
                } else {
                    format!("Loaded {} more posts", range.len())
                };
            }
            ListEvent::FetchFailed { reason, .. } => {
                let message = format!("Error loading posts: {reason}");
                if self.items.is_empty() {
                    self.error = Some(message.clone());
                }
                self.status = message;
            }
        }
    }

    pub fn set_locations(&mut self, locations: Vec<Location>) {
        self.status = if locations.is_empty() {
            "No locations available".into()
        } else {
            format!("Loaded {} locations", locations.len())
        };
        self.locations = locations;
    }

    /// The location the list is filtered by, once the location list has it.
    pub fn active_location(&self) -> Option<&Location> {
        match self.context {
            Some(FilterContext::Location(id)) => self.locations.iter().find(|l| l.id == id),
            _ => None,
        }
    }

    pub fn location_name(&self, id: i64) -> Option<&str> {
        self.locations
            .iter()
            .find(|l| l.id == id)
            .map(|l| l.name.as_str())
    }

    /// The location after the current one, wrapping around.  From the
    /// all-posts feed or the welcome screen this is the first location.
    pub fn next_location(&self) -> Option<&Location> {
        let current = match self.context {
            Some(FilterContext::Location(id)) => self.locations.iter().position(|l| l.id == id),
            _ => None,
        };
        let next = current.map_or(0, |i| (i + 1) % self.locations.len().max(1));
        self.locations.get(next)
    }

    // -- navigation ----------------------------------------------------------

    pub fn selected_post(&self) -> Option<&Post> {
        self.list_state.selected().and_then(|i| self.items.get(i))
    }

    fn window(&self, dy: i32) -> ScrollWindow {
        let first_visible = self.list_state.offset();
        let total = self.items.len();
        ScrollWindow {
            first_visible,
            visible: self.viewport.min(total.saturating_sub(first_visible)),
            total,
            dy,
        }
    }

    fn move_to(&mut self, target: usize) -> ScrollWindow {
        let before = self.list_state.selected();
        self.list_state.select(Some(target));
        if before != Some(target) {
            self.forget_failed_image();
        }
        let dy = match before {
            Some(b) => target as i32 - b as i32,
            None => 0,
        };
        self.window(dy)
    }

    pub fn select_next(&mut self) -> Option<ScrollWindow> {
        if self.items.is_empty() {
            return None;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.items.len() - 1),
            None => 0,
        };
        Some(self.move_to(i))
    }

    pub fn select_previous(&mut self) -> Option<ScrollWindow> {
        if self.items.is_empty() {
            return None;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        Some(self.move_to(i))
    }

    pub fn select_first(&mut self) -> Option<ScrollWindow> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.move_to(0))
    }

    pub fn select_last(&mut self) -> Option<ScrollWindow> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.move_to(self.items.len() - 1))
    }

    // -- images --------------------------------------------------------------

    /// Featured image URL of the selected post that has not been requested
    /// yet.  Marks it as loading.
    pub fn image_to_request(&mut self) -> Option<String> {
        let url = self.selected_post()?.featured_image_url.clone()?;
        if self.images.contains_key(&url) {
            return None;
        }
        self.images.insert(url.clone(), ImageStatus::Loading);
        Some(url)
    }

    pub fn image_status(&self, url: &str) -> Option<&ImageStatus> {
        self.images.get(url)
    }

    /// Forget every failed load so the next selection asks the cache again.
    pub fn retry_failed_images(&mut self) {
        self.images
            .retain(|_, status| !matches!(status, ImageStatus::Failed(_)));
    }

    /// A failed image is retried when its post is selected again.
    fn forget_failed_image(&mut self) {
        let Some(url) = self
            .selected_post()
            .and_then(|post| post.featured_image_url.clone())
        else {
            return;
        };
        if matches!(self.images.get(&url), Some(ImageStatus::Failed(_))) {
            self.images.remove(&url);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
