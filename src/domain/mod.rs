//! Domain layer for the book-inquiry client.
//!
//! This module contains the core domain types, independent of the store
//! framework and of any transport. Search results are plain data; everything
//! that decides *when* they are fetched lives in [`crate::app`].
//!
//! # Organization
//!
//! - [`error`]: Error types and result aliases
//! - [`book`]: Result items and the proxy's search payload
//!
//! # Examples
//!
//! ```
//! use book_inquiry::domain::{Book, Result};
//!
//! fn first_title(books: &[Book]) -> Result<String> {
//!     Ok(books.first().map(|b| b.title.clone()).unwrap_or_default())
//! }
//! ```

pub mod book;
pub mod error;

pub use book::{Book, SearchResponse};
pub use error::{BookInquiryError, DispatchError, Result};
