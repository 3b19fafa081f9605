//! Book Inquiry: a book search client built on a small reactive store.
//!
//! The client sends a query to a catalog proxy, shows one page of results at a
//! time, and keeps the neighbouring page warm in a per-query cache so paging
//! feels instant. All state lives in one store made of namespaced modules;
//! the presentation layer only dispatches actions and re-renders from state.
//!
//! # Architecture
//!
//! The crate follows a layered architecture pattern:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Interactive client (main.rs)                       │  ← Entry point
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Application Layer (app/)                           │  ← Store modules
//! │  - items, pagination, history, ping, ui             │  ← Root actions
//! │  - Event handling                                   │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ Store (store/)│   │ UI Layer      │   │ Observability │
//! │ - State +     │   │ (ui/)         │   │ - JSON logs   │
//! │   computed    │   │ - View model  │   │ - Rotation    │
//! │ - Dispatch    │   │ - Text output │   │               │
//! │ - Next tick   │   │               │   │               │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!         │
//! ┌─────────────────────────────────────────────────────┐
//! │  Infrastructure & Domain Layers                     │
//! │  - HTTP fetch, URI encoding, paths                  │
//! │  - Error types, result items                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`store`]: Generic store framework (modules, computed state, dispatch)
//! - [`app`]: The search client's store modules and workflows
//! - [`domain`]: Core domain types (Book, errors)
//! - [`infrastructure`]: HTTP capability, URI encoding, platform paths
//! - [`ui`]: Plain-text rendering
//! - [`observability`]: Tracing subscriber and rotating log file
//!
//! # Configuration
//!
//! Configuration comes from `key=value` command-line arguments or a TOML file
//! with the same keys:
//!
//! ```toml
//! api_base_url = "https://proxy.example/api/"
//! items_per_request = 20
//! country = "US"
//! trace_level = "debug"
//! log_dir = "~/.local/state/book-inquiry"
//! ```
//!
//! # Example
//!
//! ```rust
//! use book_inquiry::app::MemoryHistory;
//! use book_inquiry::infrastructure::ReqwestFetch;
//! use book_inquiry::{initialize, Config};
//! use std::rc::Rc;
//!
//! let store = initialize(
//!     &Config::default(),
//!     Rc::new(ReqwestFetch::new()),
//!     Rc::new(MemoryHistory::new("/")),
//! );
//!
//! assert_eq!(store.value("itemsPerRequest"), serde_json::json!(20));
//! assert!(store.module_state("items").is_some());
//! ```

#![allow(clippy::multiple_crate_versions)]

pub mod app;
pub mod domain;
pub mod infrastructure;
pub mod observability;
pub mod store;
pub mod ui;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use app::{handle_event, Control, Event, RootState};
pub use domain::{BookInquiryError, Result};
pub use store::StoreRoot;

use app::history::{HistoryBackend, HistoryModule};
use app::items::{ItemsInit, ItemsModule, RequestOptions};
use app::pagination::PaginationModule;
use app::status::UiStatusModule;
use app::warmup::{WarmupInit, WarmupModule};
use infrastructure::Fetch;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

/// Proxy used when no base URL is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://us-central1-book-inquiry.cloudfunctions.net/api/";

/// Upper bound the proxy accepts for a page size.
pub const MAX_ITEMS_PER_REQUEST: u64 = 40;

/// Client configuration.
///
/// # Example
///
/// ```rust
/// use book_inquiry::Config;
///
/// let config = Config::from_toml_str("items_per_request = 10\ncountry = \"gb\"").unwrap();
/// assert_eq!(config.items_per_request, 10);
/// assert_eq!(config.country.as_deref(), Some("GB"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the catalog proxy, always ending in `/`.
    ///
    /// Default: [`DEFAULT_API_BASE_URL`]
    pub api_base_url: String,

    /// Results per page, within `1..=40`. Default: 20
    pub items_per_request: u64,

    /// Two-letter catalog country code, uppercased.
    ///
    /// `None` lets the proxy pick its default.
    pub country: Option<String>,

    /// Tracing level.
    ///
    /// Options: `trace`, `debug`, `info`, `warn`, `error`. Default: `"info"`
    pub trace_level: Option<String>,

    /// Directory for the log file. Default: the data directory.
    pub log_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            items_per_request: app::items::DEFAULT_ITEMS_PER_REQUEST,
            country: None,
            trace_level: None,
            log_dir: None,
        }
    }
}

/// Raw file contents before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    api_base_url: Option<String>,
    items_per_request: Option<u64>,
    country: Option<String>,
    trace_level: Option<String>,
    log_dir: Option<String>,
}

impl Config {
    /// Parses configuration from a string map.
    ///
    /// Invalid values fall back to their defaults.
    ///
    /// # Parsing Rules
    ///
    /// - `api_base_url`: must parse as an absolute URL; a trailing `/` is added
    /// - `items_per_request`: integer, clamped to `1..=40`
    /// - `country`: two ASCII letters, uppercased; anything else is dropped
    /// - `trace_level`, `log_dir`: taken as-is
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use book_inquiry::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("api_base_url".to_string(), "http://localhost:8080/api".to_string());
    /// map.insert("items_per_request".to_string(), "100".to_string());
    ///
    /// let config = Config::from_map(&map);
    /// assert_eq!(config.api_base_url, "http://localhost:8080/api/");
    /// assert_eq!(config.items_per_request, 40);
    /// ```
    #[must_use]
    pub fn from_map(config: &BTreeMap<String, String>) -> Self {
        let defaults = Self::default();

        let api_base_url = config
            .get("api_base_url")
            .and_then(|url| {
                normalize_base_url(url)
                    .inspect_err(|e| tracing::warn!(error = %e, "ignoring api_base_url"))
                    .ok()
            })
            .unwrap_or(defaults.api_base_url);

        let items_per_request = config
            .get("items_per_request")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map_or(defaults.items_per_request, clamp_items_per_request);

        Self {
            api_base_url,
            items_per_request,
            country: config.get("country").and_then(|c| normalize_country(c)),
            trace_level: config.get("trace_level").cloned(),
            log_dir: config.get("log_dir").cloned(),
        }
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`BookInquiryError::Config`] if the text is not valid TOML, has
    /// unknown keys, or names an invalid base URL.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| BookInquiryError::Config(e.to_string()))?;
        let defaults = Self::default();

        let api_base_url = match file.api_base_url {
            Some(url) => normalize_base_url(&url)?,
            None => defaults.api_base_url,
        };

        Ok(Self {
            api_base_url,
            items_per_request: file
                .items_per_request
                .map_or(defaults.items_per_request, clamp_items_per_request),
            country: file.country.as_deref().and_then(normalize_country),
            trace_level: file.trace_level,
            log_dir: file.log_dir,
        })
    }

    /// Reads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`BookInquiryError::Io`] if the file cannot be read, or any
    /// error from [`Config::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let mut url = url::Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(BookInquiryError::Config(format!(
            "api_base_url cannot be a base: {raw}"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url.to_string())
}

fn clamp_items_per_request(n: u64) -> u64 {
    n.clamp(1, MAX_ITEMS_PER_REQUEST)
}

fn normalize_country(raw: &str) -> Option<String> {
    let code = raw.trim();
    (code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| code.to_ascii_uppercase())
}

/// Builds the store with every client module registered.
///
/// Creates a [`StoreRoot`] holding the root fields (`searchValue`,
/// `lastSearchValue`, `itemsPerRequest`), then adds:
///
/// | Namespace | Module |
/// |---|---|
/// | `items` | [`ItemsModule`] using `fetch` |
/// | `history` | [`HistoryModule`] backed by `history` |
/// | `pagination` | [`PaginationModule`] |
/// | `ping` | [`WarmupModule`] using `fetch` |
/// | `ui` | [`UiStatusModule`] |
///
/// and finally the root actions ([`app::actions::register`]).
///
/// # Side Effects
///
/// If `history` is positioned on a `?q=` URL, a `navigationChange` dispatch is
/// queued on the store's scheduler.
pub fn initialize(config: &Config, fetch: Rc<dyn Fetch>, history: Rc<dyn HistoryBackend>) -> StoreRoot {
    tracing::debug!(
        api_base_url = %config.api_base_url,
        items_per_request = config.items_per_request,
        "initializing store"
    );

    let store = StoreRoot::new(app::state::initial_root_state(config.items_per_request));

    store.add_module::<ItemsModule>(
        app::items::NAMESPACE,
        ItemsInit {
            fetch: Rc::clone(&fetch),
            options: RequestOptions {
                base_url: config.api_base_url.clone(),
                country: config.country.clone(),
            },
        },
    );
    store.add_module::<HistoryModule>(app::history::NAMESPACE, history);
    store.add_module::<PaginationModule>(app::pagination::NAMESPACE, ());
    store.add_module::<WarmupModule>(
        app::warmup::NAMESPACE,
        WarmupInit {
            fetch,
            base_url: config.api_base_url.clone(),
        },
    );
    store.add_module::<UiStatusModule>(app::status::NAMESPACE, ());

    app::actions::register(&store);

    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_map_falls_back_on_invalid_values() {
        let map: BTreeMap<String, String> = [
            ("api_base_url", "not a url"),
            ("items_per_request", "many"),
            ("country", "USA"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = Config::from_map(&map);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_items_per_request_is_clamped() {
        let map = BTreeMap::from([("items_per_request".to_string(), "0".to_string())]);
        assert_eq!(Config::from_map(&map).items_per_request, 1);
    }

    #[test]
    fn test_load_reads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api_base_url = \"https://proxy.example/api\"\ncountry = \" de \"\ntrace_level = \"debug\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.api_base_url, "https://proxy.example/api/");
        assert_eq!(config.country.as_deref(), Some("DE"));
        assert_eq!(config.trace_level.as_deref(), Some("debug"));
        assert_eq!(config.items_per_request, 20);
    }

    #[test]
    fn test_toml_rejects_bad_input() {
        assert!(matches!(
            Config::from_toml_str("colour = \"blue\""),
            Err(BookInquiryError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("api_base_url = \"::\""),
            Err(BookInquiryError::Url(_))
        ));
        assert!(matches!(
            Config::load("/nonexistent/book-inquiry.toml"),
            Err(BookInquiryError::Io(_))
        ));
    }

    #[test]
    fn test_initialize_registers_every_module() {
        let store = initialize(
            &Config::default(),
            Rc::new(testkit::ScriptedFetch::new()),
            Rc::new(app::MemoryHistory::new("/")),
        );

        for name in ["items", "history", "pagination", "ping", "ui"] {
            assert!(store.module_state(name).is_some(), "missing module {name}");
        }
        assert_eq!(store.value("searchValue"), serde_json::json!(""));
    }
}
