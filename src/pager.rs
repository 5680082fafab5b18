//! Pagination controller.
//!
//! Owns the one authoritative [`ListState`] for the active
//! [`FilterContext`] and decides when a fetch may start.  The rules:
//!
//! * page 1 (activation or refresh) **replaces** the list;
//! * later pages are **appended**, dropping any id already present;
//! * at most one fetch is in flight; every trigger that arrives meanwhile is
//!   ignored;
//! * a scroll trigger after the feed is exhausted is ignored;
//! * a failed fetch leaves the list exactly as it was;
//! * switching context bumps a generation counter, and any completion
//!   carrying an older generation is dropped on arrival.
//!
//! Triggers only *request* a transition.  The list itself is mutated in the
//! completion handler, under the same lock that guards the loading flag.
//!
//! ```text
//!            trigger (not loading)            completion (current gen)
//!   Idle ─────────────────────────► Fetching ─────────────────────────► Idle
//!    ▲  trigger while Fetching: no-op                                    │
//!    └───────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::fetcher::{FilterContext, Page, PageFetcher};
use crate::source::Post;

/// Records requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// How close to the end of the list a downward scroll must get before the
/// next page is requested.
pub const DEFAULT_LOOKAHEAD: usize = 2;

// ---------------------------------------------------------------------------
// Scroll trigger policy
// ---------------------------------------------------------------------------

/// What the view reports after a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollWindow {
    /// Index of the first visible item.
    pub first_visible: usize,
    /// Number of items currently visible.
    pub visible: usize,
    /// Number of items in the list.
    pub total: usize,
    /// Net scroll displacement; positive is downward.
    pub dy: i32,
}

impl ScrollWindow {
    /// Only downward motion that brings the window within `lookahead` items
    /// of the end qualifies.
    pub fn near_end(&self, lookahead: usize) -> bool {
        self.dy > 0 && self.first_visible + self.visible >= self.total.saturating_sub(lookahead)
    }
}

// ---------------------------------------------------------------------------
// List state
// ---------------------------------------------------------------------------

/// Accumulated records and paging flags for one filter context.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState {
    items: Vec<Post>,
    seen: HashSet<i64>,
    current_page: u32,
    has_more: bool,
    loading: bool,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            current_page: 0,
            has_more: true,
            loading: false,
        }
    }
}

impl ListState {
    pub fn items(&self) -> &[Post] {
        &self.items
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Swap in a fresh first page.  Duplicates inside the page keep their
    /// first occurrence.  Returns the new length.
    fn replace(&mut self, records: Vec<Post>) -> usize {
        self.items.clear();
        self.seen.clear();
        self.append(records);
        self.items.len()
    }

    /// Append the records whose id is new.  Returns the index range of what
    /// was actually inserted.
    fn append(&mut self, records: Vec<Post>) -> Range<usize> {
        let start = self.items.len();
        for post in records {
            if self.seen.insert(post.id) {
                self.items.push(post);
            }
        }
        start..self.items.len()
    }

    /// Fold a completed page in and recompute the paging flags.
    fn apply(&mut self, page: Page<Post>, page_size: u32) -> Merge {
        let has_more = page.is_full(page_size);
        let merge = if page.page <= 1 {
            Merge::Replaced(self.replace(page.records))
        } else {
            Merge::Appended(self.append(page.records))
        };
        self.current_page = page.page;
        self.has_more = has_more;
        merge
    }
}

enum Merge {
    Replaced(usize),
    Appended(Range<usize>),
}

/// A read-only copy of the list for the view layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot {
    pub context: Option<FilterContext>,
    pub items: Vec<Post>,
    pub current_page: u32,
    pub has_more: bool,
    pub loading: bool,
}

// ---------------------------------------------------------------------------
// Events and trigger outcomes
// ---------------------------------------------------------------------------

/// Change notifications for the view layer.  Only emitted for the context
/// that is active when the change lands.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent {
    /// Page 1 landed; the whole list changed.
    ItemsReplaced { context: FilterContext, count: usize },
    /// A later page landed; `range` indexes the new items.  May be empty if
    /// every record was a duplicate.
    ItemsAppended {
        context: FilterContext,
        range: Range<usize>,
    },
    /// The fetch for `page` failed; the list is unchanged.
    FetchFailed {
        context: FilterContext,
        page: u32,
        reason: FetchError,
    },
}

impl ListEvent {
    pub fn context(&self) -> FilterContext {
        match self {
            ListEvent::ItemsReplaced { context, .. }
            | ListEvent::ItemsAppended { context, .. }
            | ListEvent::FetchFailed { context, .. } => *context,
        }
    }
}

/// What a trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A fetch for `page` is now in flight.
    Started { page: u32 },
    Ignored(Ignored),
}

/// Why a trigger was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    /// A fetch is already in flight for this list.
    InFlight,
    /// The last page came back short.
    Exhausted,
    /// No context is active.
    Inactive,
    /// The scroll did not bring the end of the list into range.
    NotNearEnd,
}

#[derive(Debug, Clone, Copy)]
enum Request {
    FirstPage,
    NextPage,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

struct Shared {
    /// Bumped on every context change.  Completions carry the value they
    /// started with.
    generation: u64,
    context: Option<FilterContext>,
    list: ListState,
}

/// Drives page fetches for the active filter context.
///
/// Fetches run on spawned tokio tasks, so every trigger must be called from
/// inside a runtime.
pub struct Pager {
    fetcher: Arc<PageFetcher>,
    page_size: u32,
    lookahead: usize,
    shared: Arc<Mutex<Shared>>,
    events: mpsc::UnboundedSender<ListEvent>,
}

impl Pager {
    /// Create an inactive pager and the receiving end of its event stream.
    pub fn new(
        fetcher: Arc<PageFetcher>,
        page_size: u32,
        lookahead: usize,
    ) -> (Self, mpsc::UnboundedReceiver<ListEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let pager = Self {
            fetcher,
            page_size: page_size.max(1),
            lookahead,
            shared: Arc::new(Mutex::new(Shared {
                generation: 0,
                context: None,
                list: ListState::default(),
            })),
            events,
        };
        (pager, rx)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn context(&self) -> Option<FilterContext> {
        lock(&self.shared).context
    }

    /// Make `context` the active list, discarding whatever was there, and
    /// request its first page.  Any fetch still in flight for the previous
    /// context is disregarded when it lands.
    pub fn activate(&self, context: FilterContext) -> Trigger {
        {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.context = Some(context);
            shared.list = ListState::default();
            debug!(%context, generation = shared.generation, "context activated");
        }
        self.start(Request::FirstPage)
    }

    /// Tear down the active list.  Late completions are dropped.
    pub fn deactivate(&self) {
        let mut shared = lock(&self.shared);
        shared.generation += 1;
        shared.context = None;
        shared.list = ListState::default();
        debug!(generation = shared.generation, "context deactivated");
    }

    /// Re-request page 1 (pull-to-refresh).
    pub fn refresh(&self) -> Trigger {
        self.start(Request::FirstPage)
    }

    /// Request the page after the last one merged.
    pub fn load_more(&self) -> Trigger {
        self.start(Request::NextPage)
    }

    /// Feed a scroll report through the proximity policy.
    pub fn on_scroll(&self, window: ScrollWindow) -> Trigger {
        if !window.near_end(self.lookahead) {
            return Trigger::Ignored(Ignored::NotNearEnd);
        }
        self.load_more()
    }

    pub fn snapshot(&self) -> ListSnapshot {
        let shared = lock(&self.shared);
        ListSnapshot {
            context: shared.context,
            items: shared.list.items.clone(),
            current_page: shared.list.current_page(),
            has_more: shared.list.has_more(),
            loading: shared.list.is_loading(),
        }
    }

    fn start(&self, request: Request) -> Trigger {
        let (context, generation, page) = {
            let mut shared = lock(&self.shared);
            let Some(context) = shared.context else {
                return Trigger::Ignored(Ignored::Inactive);
            };
            if shared.list.is_loading() {
                debug!(%context, ?request, "fetch already in flight");
                return Trigger::Ignored(Ignored::InFlight);
            }
            let page = match request {
                Request::FirstPage => 1,
                Request::NextPage if !shared.list.has_more => {
                    return Trigger::Ignored(Ignored::Exhausted);
                }
                Request::NextPage => shared.list.current_page + 1,
            };
            shared.list.loading = true;
            (context, shared.generation, page)
        };

        debug!(%context, page, generation, "fetch started");
        let fetcher = Arc::clone(&self.fetcher);
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let page_size = self.page_size;

        tokio::spawn(async move {
            let result = fetcher.fetch_page(&context, page, page_size).await;
            complete(&shared, &events, generation, context, page, page_size, result);
        });

        Trigger::Started { page }
    }
}

/// Completion handler: the only place a fetched page touches the list.
fn complete(
    shared: &Mutex<Shared>,
    events: &mpsc::UnboundedSender<ListEvent>,
    generation: u64,
    context: FilterContext,
    page: u32,
    page_size: u32,
    result: Result<Page<Post>, FetchError>,
) {
    let mut shared = lock(shared);
    if shared.generation != generation {
        debug!(%context, page, generation, current = shared.generation, "dropping stale page");
        return;
    }
    shared.list.loading = false;

    let event = match result {
        Ok(fetched) => match shared.list.apply(fetched, page_size) {
            Merge::Replaced(count) => {
                info!(%context, page, count, has_more = shared.list.has_more, "list replaced");
                ListEvent::ItemsReplaced { context, count }
            }
            Merge::Appended(range) => {
                info!(
                    %context,
                    page,
                    added = range.len(),
                    total = shared.list.items.len(),
                    has_more = shared.list.has_more,
                    "page appended"
                );
                ListEvent::ItemsAppended { context, range }
            }
        },
        Err(reason) => {
            warn!(%context, page, error = %reason, "page fetch failed");
            ListEvent::FetchFailed {
                context,
                page,
                reason,
            }
        }
    };

    // Sent under the lock so events arrive in the order the state changed.
    // A closed channel just means nobody is watching any more.
    let _ = events.send(event);
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
