//! Filesystem locations for client data.
//!
//! The client keeps nothing between sessions except its own log files, which
//! live in a per-user data directory.

use std::path::PathBuf;

/// Directory name under the platform data directory.
const APP_DIR: &str = "book-inquiry";

/// Returns the data directory for book-inquiry logs.
///
/// Resolves to the platform's local data directory (for example
/// `~/.local/share/book-inquiry` on Linux), falling back to the system
/// temporary directory when no home directory can be determined.
///
/// # Examples
///
/// ```
/// use book_inquiry::infrastructure::get_data_dir;
///
/// let data_dir = get_data_dir();
/// assert!(data_dir.ends_with("book-inquiry"));
/// ```
#[must_use]
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Resolves the log directory: an explicit override, else [`get_data_dir`].
///
/// A leading `~/` in the override is expanded to the home directory.
///
/// # Examples
///
/// ```
/// use book_inquiry::infrastructure::log_dir;
/// use std::path::PathBuf;
///
/// assert_eq!(log_dir(Some("/var/log/books")), PathBuf::from("/var/log/books"));
/// assert!(log_dir(None).ends_with("book-inquiry"));
/// ```
#[must_use]
pub fn log_dir(configured: Option<&str>) -> PathBuf {
    configured.map_or_else(get_data_dir, expand_tilde)
}

/// Expands a leading `~` to the user's home directory.
///
/// Paths without a tilde, or a tilde when no home directory is known, are
/// returned unchanged.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        (None, Some(home)) if path == "~" => home,
        _ => PathBuf::from(path),
    }
}
