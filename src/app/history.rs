//! History module: keeps the navigation history in step with the store.
//!
//! Each completed search or page move pushes a history entry carrying the
//! page state and a `?q=<query>&page=<n>` URL. Walking the history back or
//! forward delivers the stored state to `history/popState`, which turns it
//! into a `navigationChange` dispatch (or `clearState` when the entry holds
//! no search).
//!
//! The navigation stack itself sits behind [`HistoryBackend`];
//! [`MemoryHistory`] is the in-process implementation used by the client and
//! the tests.

use crate::domain::error::Result;
use crate::infrastructure::uri::{decode_uri_component, encode_uri_component};
use crate::store::module::{arg, ActionTable, InitialState, ModuleContext, StoreModule};
use crate::store::state::{positive_integer, Computed, State};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// Namespace the module is registered under.
pub const NAMESPACE: &str = "history";

/// Title attached to pushed entries.
pub const TITLE: &str = "Book Inquiry";

/// The part of the store that a history entry restores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    /// 1-based page.
    pub current_page: u64,
    /// Query text.
    pub search_value: String,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            current_page: 1,
            search_value: String::new(),
        }
    }
}

impl PageState {
    /// Reads a page state leniently: a bad page becomes 1, a missing query "".
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            current_page: value
                .get("currentPage")
                .and_then(positive_integer)
                .unwrap_or(1),
            search_value: value
                .get("searchValue")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// The state as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "currentPage": self.current_page, "searchValue": self.search_value })
    }
}

/// Parses `?q=<query>&page=<n>` into a page state.
///
/// A missing or non-positive page becomes 1; a missing query becomes "".
///
/// # Example
///
/// ```rust
/// use book_inquiry::app::history::parse_query;
///
/// let state = parse_query("?q=a%20bit%20of%20text&page=3");
/// assert_eq!(state.search_value, "a bit of text");
/// assert_eq!(state.current_page, 3);
/// assert_eq!(parse_query("").current_page, 1);
/// ```
#[must_use]
pub fn parse_query(query: &str) -> PageState {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut state = PageState::default();

    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, raw) = pair.split_once('=').unwrap_or((pair, ""));
        let value = decode_uri_component(raw).unwrap_or_else(|| raw.to_string());
        match key {
            "q" => state.search_value = value,
            "page" => state.current_page = positive_integer(&Value::String(value)).unwrap_or(1),
            _ => {}
        }
    }
    state
}

fn query_params(state: &State) -> Result<Value> {
    let page_state = state.get("pageState").map(PageState::from_value).unwrap_or_default();
    Ok(json!({ "q": page_state.search_value, "page": page_state.current_page }))
}

fn page_url(state: &State) -> Result<Value> {
    let params = state.get("queryParams").cloned().unwrap_or(Value::Null);
    let q = params.get("q").and_then(Value::as_str).unwrap_or("");
    let page = params.get("page").and_then(Value::as_u64).unwrap_or(1);
    Ok(json!(format!(
        "?q={}&page={}",
        encode_uri_component(q),
        encode_uri_component(&page.to_string())
    )))
}

/// Storage for navigation entries.
pub trait HistoryBackend {
    /// Query string (`?q=...&page=...`) of the current entry; may be empty.
    fn location(&self) -> String;

    /// Adds an entry after the current one, dropping any forward entries.
    fn push_state(&self, state: &PageState, title: &str, url: &str);
}

/// One navigation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// State pushed with the entry; `None` for the entry the session opened on.
    pub state: Option<PageState>,
    /// Entry title.
    pub title: String,
    /// Query-string URL.
    pub url: String,
}

/// In-process history stack with back/forward navigation.
#[derive(Debug)]
pub struct MemoryHistory {
    entries: RefCell<Vec<HistoryEntry>>,
    index: Cell<usize>,
}

impl MemoryHistory {
    /// Starts a history whose first entry is `url` with no state.
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            entries: RefCell::new(vec![HistoryEntry {
                state: None,
                title: String::new(),
                url: url.to_string(),
            }]),
            index: Cell::new(0),
        }
    }

    /// Steps back; returns the state to hand to `history/popState`.
    ///
    /// Returns `None` when already at the oldest entry.
    pub fn back(&self) -> Option<Value> {
        let index = self.index.get().checked_sub(1)?;
        Some(self.go(index))
    }

    /// Steps forward; returns the state to hand to `history/popState`.
    ///
    /// Returns `None` when already at the newest entry.
    pub fn forward(&self) -> Option<Value> {
        let index = self.index.get() + 1;
        if index >= self.entries.borrow().len() {
            return None;
        }
        Some(self.go(index))
    }

    fn go(&self, index: usize) -> Value {
        self.index.set(index);
        self.entries.borrow()[index]
            .state
            .as_ref()
            .map_or(Value::Null, PageState::to_value)
    }

    /// The current entry.
    #[must_use]
    pub fn current(&self) -> HistoryEntry {
        self.entries.borrow()[self.index.get()].clone()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Always `false`: a history holds at least its opening entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl HistoryBackend for MemoryHistory {
    fn location(&self) -> String {
        self.current().url
    }

    fn push_state(&self, state: &PageState, title: &str, url: &str) {
        let mut entries = self.entries.borrow_mut();
        entries.truncate(self.index.get() + 1);
        entries.push(HistoryEntry {
            state: Some(state.clone()),
            title: title.to_string(),
            url: url.to_string(),
        });
        self.index.set(entries.len() - 1);
    }
}

/// Mirrors page state into the navigation history.
pub struct HistoryModule {
    ctx: ModuleContext,
    backend: Rc<dyn HistoryBackend>,
}

impl HistoryModule {
    /// The page state the module currently holds.
    #[must_use]
    pub fn page_state(&self) -> PageState {
        PageState::from_value(&self.ctx.value("pageState"))
    }

    fn set_page_state(&self, page_state: &PageState) -> Result<()> {
        self.ctx.set_value("pageState", page_state.to_value())
    }

    /// Records `{searchValue, paginationState.currentPage}` from `root_state`
    /// and pushes it as a new history entry.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub fn push_state(&self, root_state: &Value) -> Result<()> {
        let page_state = PageState {
            search_value: root_state
                .get("searchValue")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            current_page: root_state
                .get("paginationState")
                .and_then(|p| p.get("currentPage"))
                .and_then(positive_integer)
                .unwrap_or(1),
        };
        self.set_page_state(&page_state)?;

        let url = self.ctx.value("pageUrl");
        let url = url.as_str().unwrap_or_default();
        debug!(url = %url, "pushing history entry");
        self.backend.push_state(&page_state, TITLE, url);
        Ok(())
    }

    /// Restores the store from a history entry's state.
    ///
    /// With no state, the page state is re-read from the current URL; if that
    /// holds no search, the store is cleared instead.
    ///
    /// # Errors
    ///
    /// Propagates state write failures.
    pub async fn pop_state(&self, state: &Value) -> Result<Value> {
        let page_state = if state.is_null() {
            let page_state = parse_query(&self.backend.location());
            self.set_page_state(&page_state)?;
            if page_state.search_value.is_empty() {
                debug!("history entry without a search, clearing state");
                return Ok(self.ctx.dispatch("clearState", vec![]).await.unwrap_or(Value::Null));
            }
            page_state
        } else {
            let page_state = PageState::from_value(state);
            self.set_page_state(&page_state)?;
            page_state
        };

        debug!(search = %page_state.search_value, page = page_state.current_page, "restoring history entry");
        Ok(self
            .ctx
            .dispatch("navigationChange", vec![page_state.to_value()])
            .await
            .unwrap_or(Value::Null))
    }
}

impl std::fmt::Debug for HistoryModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryModule")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}

impl StoreModule for HistoryModule {
    type Init = Rc<dyn HistoryBackend>;

    fn oncreate(ctx: ModuleContext, backend: Rc<dyn HistoryBackend>) -> (Self, InitialState) {
        let opened_on = parse_query(&backend.location());

        if !opened_on.search_value.is_empty() {
            debug!(search = %opened_on.search_value, "opened on a search URL");
            let store = ctx.store().clone();
            let page_state = opened_on.to_value();
            ctx.defer(async move {
                store.dispatch("navigationChange", vec![page_state]).await;
            });
        }

        let initial = InitialState::new(json!({ "pageState": opened_on.to_value() }))
            .computed(Computed::new("queryParams", query_params))
            .computed(Computed::new("pageUrl", page_url));

        (Self { ctx, backend }, initial)
    }

    fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    fn actions(module: &Rc<Self>, table: &mut ActionTable) {
        table
            .bind_sync("pushState", module, |m, args| {
                m.push_state(arg(&args, 0))?;
                Ok(Value::Null)
            })
            .bind("popState", module, |m, args| async move {
                m.pop_state(arg(&args, 0)).await
            });
    }
}
