//! Application layer: the store modules and workflows of the search client.
//!
//! This module composes the generic store framework ([`crate::store`]) into
//! the book search client: one module per concern, root actions that chain
//! them into workflows, and the event handler the interactive client drives.
//!
//! # Architecture
//!
//! ```text
//! Input → Event → handle_event → dispatch(root action) → module actions
//!                                                             │
//!         render ← subscribers ← "<name>State" ◀──────────────┘
//! ```
//!
//! # Modules
//!
//! | Namespace | Type | Concern |
//! |---|---|---|
//! | `items` | [`ItemsModule`] | results, cache, prefetch |
//! | `pagination` | [`PaginationModule`] | page bounds |
//! | `history` | [`HistoryModule`] | navigation entries |
//! | `ping` | [`WarmupModule`] | proxy warm-up |
//! | `ui` | [`UiStatusModule`] | loading and error flags |
//!
//! - [`actions`]: Root actions (`newSearch`, `navigationChange`, ...)
//! - [`handler`]: Client events and their dispatches
//! - [`state`]: Typed views over global state
//! - [`cache`]: The per-query page cache

pub mod actions;
pub mod cache;
pub mod handler;
pub mod history;
pub mod items;
pub mod pagination;
pub mod state;
pub mod status;
pub mod warmup;

pub use handler::{handle_event, Control, Event};
pub use history::{HistoryBackend, HistoryModule, MemoryHistory, PageState};
pub use items::{ItemsInit, ItemsModule, RequestOptions};
pub use pagination::PaginationModule;
pub use state::RootState;
pub use status::UiStatusModule;
pub use warmup::{WarmupInit, WarmupModule};
