//! Terminal presentation of the store's state.
//!
//! The store knows nothing about rendering. The binary subscribes to the store
//! and, after every state change, reads a [`RootState`](crate::app::RootState)
//! view and passes it through here.
//!
//! ```text
//! RootState → UIViewModel::from_root → render_viewmodel → Write
//! ```
//!
//! # Modules
//!
//! - [`viewmodel`]: Display-ready view model types
//! - [`renderer`]: Line-oriented text output

pub mod renderer;
pub mod viewmodel;

pub use renderer::{render, render_viewmodel};
pub use viewmodel::{Body, DisplayItem, FooterInfo, HeaderInfo, PaginationInfo, UIViewModel};
