//! Tracing initialization and subscriber setup.
//!
//! This module configures the global `tracing` subscriber: an [`EnvFilter`]
//! selecting the level, and a JSON formatting layer writing through the
//! rotating [`FileWriter`].

use super::file_writer::FileWriter;
use crate::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Name of the log file inside the log directory.
pub const LOG_FILE: &str = "book-inquiry.log";

/// Picks the filter directive: `RUST_LOG`, then `trace_level`, then `"info"`.
fn filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.trace_level.as_deref().unwrap_or("info"))
    })
}

/// Initializes the tracing subscriber with JSON output to a rotating file.
///
/// Sets up a subscriber pipeline that:
/// 1. Filters events and spans by level
/// 2. Formats each event as one JSON object, including the active span stack
/// 3. Appends it to `<log dir>/book-inquiry.log`, rotating at 10 MB with
///    3 backups
///
/// # Parameters
///
/// * `config` - Client configuration providing `trace_level` and `log_dir`
///
/// # Level Resolution
///
/// 1. `RUST_LOG` environment variable, if set and valid
/// 2. `config.trace_level`, if set
/// 3. Default: `"info"`
///
/// # Initialization Behavior
///
/// - Creates the log directory if it doesn't exist
/// - Silently does nothing if the directory cannot be created
/// - Idempotent: only the first call installs a subscriber
///
/// # Example
///
/// ```rust
/// use book_inquiry::observability::init_tracing;
/// use book_inquiry::Config;
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = Config {
///     trace_level: Some("debug".to_string()),
///     log_dir: Some(dir.path().display().to_string()),
///     ..Default::default()
/// };
///
/// init_tracing(&config);
/// tracing::debug!("tracing is now active");
/// ```
pub fn init_tracing(config: &Config) {
    let dir = crate::infrastructure::paths::log_dir(config.log_dir.as_deref());
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }

    let writer = FileWriter::new(dir.join(LOG_FILE));
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(writer);

    let _ = tracing_subscriber::registry()
        .with(filter(config))
        .with(json_layer)
        .try_init();
}
