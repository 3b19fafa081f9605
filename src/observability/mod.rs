//! Structured logging to a rotating JSON file.
//!
//! The client is interactive, so logs never go to the terminal. Every
//! `tracing` event is written as one JSON line to a log file in the data
//! directory, together with the span stack it happened in. Deferred work
//! (prefetches, dispatch triggers) is instrumented with the span that
//! scheduled it, so a prefetch's events carry the dispatch that caused it.
//!
//! # Architecture
//!
//! ```text
//! tracing macros → EnvFilter → fmt::layer().json() → FileWriter → book-inquiry.log
//! ```
//!
//! # Configuration
//!
//! Level is controlled via:
//! 1. `RUST_LOG` environment variable (highest priority)
//! 2. `trace_level` config option
//! 3. Default: `"info"`
//!
//! # Modules
//!
//! - [`init`]: Subscriber setup
//! - [`file_writer`]: Rotating file writer with size-based rotation

pub mod file_writer;
pub mod init;

pub use file_writer::FileWriter;
pub use init::{init_tracing, LOG_FILE};
