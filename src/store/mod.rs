//! Reactive store framework.
//!
//! A small single-threaded store: modules own namespaced state with computed
//! properties, the root owns global state and routes named actions, and a
//! next-tick scheduler runs triggers and background work outside the call
//! stack that requested it.
//!
//! # Organization
//!
//! - [`state`]: Tagged plain/computed state and the computed-property engine
//! - [`module`]: The [`StoreModule`] trait, [`ModuleContext`] and action tables
//! - [`root`]: [`StoreRoot`], dispatch, triggers and subscriptions
//! - [`scheduler`]: The next-tick task queue
//!
//! # Data flow
//!
//! ```text
//! UI event ─▶ StoreRoot::dispatch ─▶ module action ─▶ ModuleContext::set
//!                                                        │
//!                    subscribers ◀── "<name>State" ◀─────┘ (recompute, publish)
//! ```

pub mod module;
pub mod root;
pub mod scheduler;
pub mod state;

pub use module::{arg, ActionResult, ActionTable, InitialState, ModuleContext, StoreModule};
pub use root::{StoreHandle, StoreRoot, Trigger};
pub use scheduler::Scheduler;
pub use state::{Computed, ModuleState, State};
