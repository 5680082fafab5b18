//! wp-reader — incremental sync engine for WordPress feeds.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  trigger   ┌──────────┐ fetch_page ┌──────────┐   get    ┌───────────┐
//! │   view   │ ─────────► │  pager   │ ─────────► │ fetcher  │ ───────► │ transport │
//! │ (binary) │ ◄───────── │ (state)  │ ◄───────── │ + parse  │ ◄─────── │ (reqwest) │
//! └──────────┘ ListEvent  └──────────┘ Page<Post> └──────────┘  bytes   └───────────┘
//!      │                                                                     ▲
//!      │  get(url)   ┌──────────┐                                            │
//!      └───────────► │  cache   │ ───────────────────────────────────────────┘
//!                    └──────────┘
//! ```
//!
//! * **[`source`]** — the [`Transport`](source::Transport) port, its reqwest
//!   implementation, and the [`Post`](source::Post) /
//!   [`Location`](source::Location) records.
//! * **[`parse`]** — tolerant JSON decoding of both payload shapes.
//! * **[`fetcher`]** — one paginated request per call.
//! * **[`pager`]** — the list state machine: replace on page 1, append with
//!   dedup after, one fetch in flight, stale results dropped.
//! * **[`cache`]** — URL-keyed single-flight resource cache.
//! * **[`prefs`]** — the persisted location selection.
//! * **[`error`]** — the error taxonomy shared by all of the above.
//!
//! The terminal front end in `src/main.rs` is one consumer of this library.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod pager;
pub mod parse;
pub mod prefs;
pub mod source;
