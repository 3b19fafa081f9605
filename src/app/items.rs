//! Items module: search results, the page cache and background prefetch.
//!
//! # Search session
//!
//! ```text
//! Idle ──getItems──▶ Fetching ──┬──▶ Cached ──next tick──▶ Prefetching
//!                      │        └──▶ Error
//!                      └── cache hit ──▶ Cached
//! ```
//!
//! A foreground request always publishes its outcome: the page on success,
//! `{error: true, items: [], totalItems: 0}` on any failure. The prefetch of
//! an adjacent page runs on the next tick and never publishes anything; its
//! failures are only logged.
//!
//! # Superseded responses
//!
//! Requests are not cancelled. Every foreground call takes a new generation
//! number and only the newest generation may publish; cache writes are
//! guarded by the search string they were issued for, so a response that
//! arrives after the query changed is dropped.

use crate::app::cache::{CachedPage, SearchResultCache};
use crate::domain::error::{BookInquiryError, Result};
use crate::domain::SearchResponse;
use crate::infrastructure::http::Fetch;
use crate::infrastructure::uri::encode_uri_component;
use crate::store::module::{arg, ActionTable, InitialState, ModuleContext, StoreModule};
use crate::store::state::{positive_integer, Computed, State};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn, Instrument};

/// Namespace the module is registered under.
pub const NAMESPACE: &str = "items";

/// Page size the proxy uses when `resultsPerPage` is omitted.
pub const DEFAULT_ITEMS_PER_REQUEST: u64 = 20;

/// Zero-based offset of the first result on `current_page`.
///
/// Returns 0 whenever either input is not a number of at least 1.
///
/// # Example
///
/// ```rust
/// use book_inquiry::app::items::start_index;
/// use serde_json::json;
///
/// assert_eq!(start_index(&json!(3), &json!(20)), 40);
/// assert_eq!(start_index(&json!(0), &json!(20)), 0);
/// assert_eq!(start_index(&json!(2), &json!("x")), 0);
/// ```
#[must_use]
pub fn start_index(current_page: &Value, items_per_request: &Value) -> u64 {
    match (positive_integer(current_page), positive_integer(items_per_request)) {
        (Some(page), Some(per_request)) => (page - 1).saturating_mul(per_request),
        _ => 0,
    }
}

/// The search string encoded as a URI component.
#[must_use]
pub fn encoded_search_string(search_value: &str) -> String {
    encode_uri_component(search_value)
}

/// Where and how search requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    /// Proxy base URL, ending in `/`.
    pub base_url: String,
    /// Two-letter catalog country, when configured.
    pub country: Option<String>,
}

impl RequestOptions {
    /// Builds the search URL for one page.
    ///
    /// # Example
    ///
    /// ```rust
    /// use book_inquiry::app::items::RequestOptions;
    ///
    /// let options = RequestOptions {
    ///     base_url: "https://proxy.test/api/".to_string(),
    ///     country: None,
    /// };
    /// assert_eq!(
    ///     options.request_url("a%20b", 40, 20),
    ///     "https://proxy.test/api/search?q=a%20b&startIndex=40"
    /// );
    /// ```
    #[must_use]
    pub fn request_url(&self, encoded_search: &str, start_index: u64, items_per_request: u64) -> String {
        let mut url = format!(
            "{}search?q={encoded_search}&startIndex={start_index}",
            self.base_url
        );
        if items_per_request != DEFAULT_ITEMS_PER_REQUEST {
            url.push_str(&format!("&resultsPerPage={items_per_request}"));
        }
        if let Some(country) = &self.country {
            url.push_str(&format!("&country={country}"));
        }
        url
    }
}

/// Resources handed to [`ItemsModule`] at creation.
pub struct ItemsInit {
    /// Network capability used for every request.
    pub fetch: Rc<dyn Fetch>,
    /// Request construction settings.
    pub options: RequestOptions,
}

/// Fetches, caches and publishes search results.
pub struct ItemsModule {
    ctx: ModuleContext,
    fetch: Rc<dyn Fetch>,
    options: RequestOptions,
    cache: RefCell<SearchResultCache>,
    generation: Cell<u64>,
}

impl ItemsModule {
    /// Loads the page described by `root_state` and publishes it.
    ///
    /// Reads `searchValue`, `paginationState.currentPage` and
    /// `itemsPerRequest`. Returns `true` when a page was published, `false`
    /// when the error state was published, and `null` when the response was
    /// superseded by a newer call before it arrived.
    ///
    /// # Errors
    ///
    /// Only state write failures escape; request failures become state.
    pub async fn get_items(self: &Rc<Self>, root_state: &Value) -> Result<Value> {
        // Every call supersedes those still in flight, including rejected ones.
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let search = match root_state.get("searchValue") {
            Some(Value::String(search)) if !search.is_empty() => search.clone(),
            _ => {
                debug!("rejecting search without a query");
                self.publish_error()?;
                return Ok(json!(false));
            }
        };

        if self.cache.borrow_mut().ensure_search(&search) {
            debug!(search = %search, "search changed, cache cleared");
        }

        let current_page = root_state
            .get("paginationState")
            .and_then(|p| p.get("currentPage"))
            .cloned()
            .unwrap_or(Value::Null);
        let items_per_request = root_state
            .get("itemsPerRequest")
            .cloned()
            .unwrap_or(Value::Null);
        self.ctx.set(json!({
            "searchValue": search,
            "currentPage": current_page,
            "itemsPerRequest": items_per_request,
        }))?;

        let start = self.ctx.value("startIndex").as_u64().unwrap_or(0);
        let cached = self.cache.borrow().get(&search, start).cloned();
        let outcome = match cached {
            Some(page) => {
                debug!(start_index = start, "serving page from cache");
                Ok(page)
            }
            None => self.fetch_foreground(&search, start).await,
        };

        if self.generation.get() != generation {
            debug!(search = %search, start_index = start, "discarding superseded response");
            return Ok(Value::Null);
        }

        match outcome {
            Ok(page) => {
                self.ctx.set(json!({
                    "error": false,
                    "items": page.items,
                    "totalItems": page.total_items,
                }))?;
                self.schedule_prefetch(search, start);
                Ok(json!(true))
            }
            Err(e) => {
                warn!(search = %search, start_index = start, error = %e, "search request failed");
                self.publish_error()?;
                Ok(json!(false))
            }
        }
    }

    async fn fetch_foreground(&self, search: &str, start: u64) -> Result<CachedPage> {
        let url = match self.ctx.value("requestUrl") {
            Value::String(url) => url,
            _ => return Err(BookInquiryError::computed("requestUrl", "no request URL")),
        };
        let page = self.fetch_page(&url).await?;
        self.cache.borrow_mut().insert(search, start, page.clone());
        Ok(page)
    }

    async fn fetch_page(&self, url: &str) -> Result<CachedPage> {
        let response = self.fetch.get(url).await?;
        let body: SearchResponse = response.json()?;
        if body.is_error() {
            return Err(BookInquiryError::Upstream(body.error_message()));
        }
        Ok(CachedPage {
            items: body.items,
            total_items: body.total_items,
        })
    }

    fn publish_error(&self) -> Result<()> {
        self.ctx.set(json!({ "error": true, "items": [], "totalItems": 0 }))
    }

    fn schedule_prefetch(self: &Rc<Self>, search: String, start: u64) {
        let per_request = positive_integer(&self.ctx.value("itemsPerRequest")).unwrap_or(1);
        let current_page = start / per_request + 1;
        let module = Rc::clone(self);
        let span = tracing::debug_span!("prefetch", search = %search, current_page);
        self.ctx.defer(
            async move {
                module.prefetch_items(&search, current_page, per_request).await;
            }
            .instrument(span),
        );
    }

    /// Caches a page adjacent to `current_page` in the background.
    ///
    /// Fetches the next page if it is not cached; otherwise, when past page 1,
    /// the previous page if that is not cached. An empty next page dispatches
    /// `lastPageEncountered(current_page)`. Failures are logged and dropped,
    /// as are results for a search that is no longer current.
    pub async fn prefetch_items(&self, search: &str, current_page: u64, per_request: u64) {
        if !self.cache.borrow().is_current(search) {
            debug!("search superseded before prefetch started");
            return;
        }

        let next_start = current_page.saturating_mul(per_request);
        let previous_start = current_page.saturating_sub(2).saturating_mul(per_request);
        let next_cached = self.cache.borrow().contains(search, next_start);
        let previous_cached = self.cache.borrow().contains(search, previous_start);

        let (start, is_next) = if !next_cached {
            (next_start, true)
        } else if current_page > 1 && !previous_cached {
            (previous_start, false)
        } else {
            return;
        };

        let url = self
            .options
            .request_url(&encoded_search_string(search), start, per_request);
        let page = match self.fetch_page(&url).await {
            Ok(page) => page,
            Err(e) => {
                debug!(start_index = start, error = %e, "prefetch failed");
                return;
            }
        };

        let exhausted = is_next && page.items.is_empty();
        if !self.cache.borrow_mut().insert(search, start, page) {
            debug!(start_index = start, "discarding prefetch for superseded search");
            return;
        }
        debug!(start_index = start, "page prefetched");

        if exhausted {
            self.ctx
                .dispatch("lastPageEncountered", vec![json!(current_page)])
                .await;
        }
    }

    /// Unbinds the cache from its search and drops every cached page.
    pub fn clear_cache(&self) {
        debug!("clearing result cache");
        self.cache.borrow_mut().clear();
    }

    /// The search the cache is bound to.
    #[must_use]
    pub fn cached_search(&self) -> String {
        self.cache.borrow().cached_search().to_string()
    }

    /// Number of cached pages.
    #[must_use]
    pub fn cached_pages(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl std::fmt::Debug for ItemsModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemsModule")
            .field("ctx", &self.ctx)
            .field("options", &self.options)
            .field("cache", &self.cache.borrow())
            .finish_non_exhaustive()
    }
}

fn computed_encoded_search_string(state: &State) -> Result<Value> {
    let search = state.get("searchValue").and_then(Value::as_str).unwrap_or("");
    Ok(json!(encoded_search_string(search)))
}

fn computed_start_index(state: &State) -> Result<Value> {
    let current_page = state.get("currentPage").unwrap_or(&Value::Null);
    let items_per_request = state.get("itemsPerRequest").unwrap_or(&Value::Null);
    Ok(json!(start_index(current_page, items_per_request)))
}

impl StoreModule for ItemsModule {
    type Init = ItemsInit;

    fn oncreate(ctx: ModuleContext, init: ItemsInit) -> (Self, InitialState) {
        let options = init.options.clone();
        let request_url = Computed::new("requestUrl", move |state: &State| {
            let encoded = state
                .get("encodedSearchString")
                .and_then(Value::as_str)
                .unwrap_or("");
            let start = state.get("startIndex").and_then(Value::as_u64).unwrap_or(0);
            let per_request = state
                .get("itemsPerRequest")
                .and_then(positive_integer)
                .unwrap_or(DEFAULT_ITEMS_PER_REQUEST);
            Ok(json!(options.request_url(encoded, start, per_request)))
        });

        let initial = InitialState::new(json!({
            "error": false,
            "items": [],
            "totalItems": 0,
            "searchValue": "",
            "currentPage": 1,
            "itemsPerRequest": DEFAULT_ITEMS_PER_REQUEST,
        }))
        .computed(Computed::new("encodedSearchString", computed_encoded_search_string))
        .computed(Computed::new("startIndex", computed_start_index))
        .computed(request_url);

        let module = Self {
            ctx,
            fetch: init.fetch,
            options: init.options,
            cache: RefCell::new(SearchResultCache::new()),
            generation: Cell::new(0),
        };
        (module, initial)
    }

    fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    fn actions(module: &Rc<Self>, table: &mut ActionTable) {
        table
            .bind("getItems", module, |m, args| async move {
                m.get_items(arg(&args, 0)).await
            })
            .bind_sync("clearCache", module, |m, _| {
                m.clear_cache();
                Ok(Value::Null)
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreRoot;
    use crate::testkit::{Reply, ScriptedFetch};

    const BASE: &str = "https://proxy.test/api/";

    fn options() -> RequestOptions {
        RequestOptions {
            base_url: BASE.to_string(),
            country: None,
        }
    }

    fn items(fetch: &Rc<ScriptedFetch>) -> (StoreRoot, Rc<ItemsModule>) {
        let store = StoreRoot::new(json!({}));
        let fetch: Rc<dyn Fetch> = fetch.clone();
        let module = store
            .add_module::<ItemsModule>(NAMESPACE, ItemsInit { fetch, options: options() })
            .unwrap();
        (store, module)
    }

    fn query(search: &str, page: u64) -> Value {
        json!({
            "searchValue": search,
            "paginationState": { "currentPage": page },
            "itemsPerRequest": 20,
        })
    }

    #[test]
    fn test_start_index() {
        assert_eq!(start_index(&json!(1), &json!(20)), 0);
        assert_eq!(start_index(&json!(4), &json!(10)), 30);
        assert_eq!(start_index(&json!(-2), &json!(20)), 0);
        assert_eq!(start_index(&json!(3), &json!(0)), 0);
        assert_eq!(start_index(&Value::Null, &json!(20)), 0);
        assert_eq!(start_index(&json!("2"), &json!("20")), 20);
    }

    #[test]
    fn test_request_url_extras() {
        let options = RequestOptions {
            base_url: BASE.to_string(),
            country: Some("FR".to_string()),
        };
        assert_eq!(
            options.request_url("dune", 0, 40),
            "https://proxy.test/api/search?q=dune&startIndex=0&resultsPerPage=40&country=FR"
        );
    }

    #[test]
    fn test_computed_request_url_follows_state() {
        let (store, module) = items(&Rc::new(ScriptedFetch::new()));
        module
            .ctx
            .set(json!({ "searchValue": "a bit of text", "currentPage": 2, "itemsPerRequest": 20 }))
            .unwrap();

        let state = store.module_state(NAMESPACE).unwrap();
        assert_eq!(state["encodedSearchString"], json!("a%20bit%20of%20text"));
        assert_eq!(state["startIndex"], json!(20));
        assert_eq!(
            state["requestUrl"],
            json!("https://proxy.test/api/search?q=a%20bit%20of%20text&startIndex=20")
        );
    }

    #[tokio::test]
    async fn test_fetched_page_is_published_and_cached() {
        let fetch = Rc::new(ScriptedFetch::new());
        fetch.on(0, Reply::page(120, 20, "dune"));
        let (store, module) = items(&fetch);

        assert_eq!(module.get_items(&query("dune", 1)).await.unwrap(), json!(true));

        let state = store.module_state(NAMESPACE).unwrap();
        assert_eq!(state["items"].as_array().unwrap().len(), 20);
        assert_eq!(state["totalItems"], json!(120));
        assert_eq!(state["error"], json!(false));
        assert_eq!(module.cached_pages(), 1);
        assert_eq!(fetch.start_indexes(), vec![0]);
    }

    #[tokio::test]
    async fn test_second_identical_call_is_served_from_cache() {
        let fetch = Rc::new(ScriptedFetch::new());
        fetch.on(0, Reply::page(120, 20, "dune"));
        let (store, module) = items(&fetch);

        module.get_items(&query("dune", 1)).await.unwrap();
        module.get_items(&query("dune", 1)).await.unwrap();
        store.run_until_idle().await;

        let foreground = fetch.start_indexes().iter().filter(|i| **i == 0).count();
        assert_eq!(foreground, 1);
        assert_eq!(store.module_state(NAMESPACE).unwrap()["totalItems"], json!(120));
    }

    #[tokio::test]
    async fn test_failures_publish_error_state() {
        let fetch = Rc::new(ScriptedFetch::new());
        fetch
            .on(0, Reply::Status(500))
            .on(20, Reply::Json(json!({ "error": true, "items": [], "totalItems": 0 })))
            .on(40, Reply::Transport);
        let (store, module) = items(&fetch);

        for page in 1..=3 {
            module
                .ctx
                .set(json!({ "items": [1], "totalItems": 9, "error": false }))
                .unwrap();
            assert_eq!(module.get_items(&query("dune", page)).await.unwrap(), json!(false));

            let state = store.module_state(NAMESPACE).unwrap();
            assert_eq!(state["error"], json!(true));
            assert_eq!(state["items"], json!([]));
            assert_eq!(state["totalItems"], json!(0));
        }
        assert_eq!(module.cached_pages(), 0);
        assert_eq!(store.scheduler().pending(), 0);
    }

    #[tokio::test]
    async fn test_empty_query_never_hits_network() {
        let fetch = Rc::new(ScriptedFetch::new());
        let (store, module) = items(&fetch);

        module.get_items(&query("", 1)).await.unwrap();
        module.get_items(&json!({ "searchValue": 42 })).await.unwrap();

        assert!(fetch.requests().is_empty());
        assert_eq!(store.module_state(NAMESPACE).unwrap()["error"], json!(true));
    }

    #[tokio::test]
    async fn test_prefetch_runs_next_tick_for_next_page() {
        let fetch = Rc::new(ScriptedFetch::new());
        fetch
            .on(0, Reply::page(120, 20, "dune"))
            .on(20, Reply::page(100, 20, "dune-2"));
        let (store, module) = items(&fetch);

        module.get_items(&query("dune", 1)).await.unwrap();
        assert_eq!(fetch.start_indexes(), vec![0]);

        store.run_until_idle().await;
        assert_eq!(fetch.start_indexes(), vec![0, 20]);
        assert_eq!(module.cached_pages(), 2);
    }

    #[tokio::test]
    async fn test_prefetch_falls_back_to_previous_page() {
        let fetch = Rc::new(ScriptedFetch::new());
        fetch.otherwise(Reply::page(500, 20, "dune"));
        let (store, module) = items(&fetch);

        module.get_items(&query("dune", 5)).await.unwrap();
        store.run_until_idle().await;
        assert_eq!(fetch.start_indexes(), vec![80, 100]);

        // Next page is now cached, so the following pass fetches the previous one.
        module.get_items(&query("dune", 5)).await.unwrap();
        store.run_until_idle().await;
        assert_eq!(fetch.start_indexes(), vec![80, 100, 60]);
    }

    #[tokio::test]
    async fn test_prefetch_failure_is_silent() {
        let fetch = Rc::new(ScriptedFetch::new());
        fetch
            .on(0, Reply::page(120, 20, "dune"))
            .on(20, Reply::Status(503));
        let (store, module) = items(&fetch);

        module.get_items(&query("dune", 1)).await.unwrap();
        store.run_until_idle().await;

        assert_eq!(store.module_state(NAMESPACE).unwrap()["error"], json!(false));
        assert_eq!(module.cached_pages(), 1);
    }

    #[tokio::test]
    async fn test_changing_search_clears_cache() {
        let fetch = Rc::new(ScriptedFetch::new());
        fetch.otherwise(Reply::page(40, 20, "any"));
        let (store, module) = items(&fetch);

        module.get_items(&query("dune", 1)).await.unwrap();
        store.run_until_idle().await;
        assert_eq!(module.cached_pages(), 2);

        module.get_items(&query("emma", 1)).await.unwrap();
        assert_eq!(module.cached_search(), "emma");
        assert_eq!(module.cached_pages(), 1);
        assert!(fetch.requests().last().unwrap().contains("q=emma"));
    }

    #[tokio::test]
    async fn test_late_prefetch_for_old_search_is_discarded() {
        let fetch = Rc::new(ScriptedFetch::new());
        fetch.otherwise(Reply::page(100, 20, "any")).hold(20);
        let (store, module) = items(&fetch);

        module.get_items(&query("dune", 1)).await.unwrap();
        let drive = store.run_until_idle();
        let switch = async {
            tokio::task::yield_now().await;
            module.clear_cache();
            fetch.on(0, Reply::page(7, 7, "emma"));
            module.get_items(&query("emma", 1)).await.unwrap();
            fetch.release(20);
        };
        tokio::join!(drive, switch);
        store.run_until_idle().await;

        assert_eq!(module.cached_search(), "emma");
        assert!(module.cache.borrow().get("dune", 20).is_none());
        assert_eq!(store.module_state(NAMESPACE).unwrap()["totalItems"], json!(7));
    }

    #[tokio::test]
    async fn test_rejected_query_supersedes_pending_response() {
        let fetch = Rc::new(ScriptedFetch::new());
        fetch.otherwise(Reply::page(100, 20, "dune")).hold(0);
        let (store, module) = items(&fetch);

        let dune = query("dune", 1);
        let slow = module.get_items(&dune);
        let empty = async {
            tokio::task::yield_now().await;
            let result = module.get_items(&query("", 1)).await.unwrap();
            fetch.release(0);
            result
        };
        let (slow, empty) = tokio::join!(slow, empty);

        assert_eq!(empty, json!(false));
        assert_eq!(slow.unwrap(), Value::Null);
        let state = store.module_state(NAMESPACE).unwrap();
        assert_eq!(state["error"], json!(true));
        assert_eq!(state["items"], json!([]));
    }
}
