//! Root actions: the workflows the presentation layer dispatches by name.
//!
//! Each workflow is a fixed sequence of module dispatches. Module actions read
//! what they need from a fresh copy of global state passed as their argument,
//! so every step sees the results of the steps before it.
//!
//! | Action | Steps |
//! |---|---|
//! | `newSearch` | start loading, remember the query, reset pagination, clear the cache, fetch, refresh counts, push history, stop loading |
//! | `navigationChange` | start loading, restore query and page, fetch, refresh counts, stop loading |
//! | `nextPage` / `previousPage` | start loading, move page, fetch, refresh counts, push history, stop loading |
//! | `clearState` | empty the query, reset the status flags |
//! | `lastPageEncountered` | record the ceiling in pagination |

use crate::domain::error::Result;
use crate::store::root::{StoreHandle, StoreRoot};
use crate::store::module::ActionResult;
use serde_json::{json, Value};
use std::future::Future;
use tracing::debug;

/// Registers every root action on `store`.
pub fn register(store: &StoreRoot) {
    add(store, "newSearch", |store, _| async move { new_search(&store).await });
    add(store, "navigationChange", |store, args| async move {
        navigation_change(&store, args.first().unwrap_or(&Value::Null)).await
    });
    add(store, "nextPage", |store, _| async move { move_page(&store, "pagination/nextPage").await });
    add(store, "previousPage", |store, _| async move {
        move_page(&store, "pagination/previousPage").await
    });
    add(store, "clearState", |store, _| async move { clear_state(&store).await });
    add(store, "setLastSearchValue", |store, _| async move {
        set_last_search_value(&store);
        Ok(Value::Null)
    });
    add(store, "setSearchValue", |store, args| async move {
        let value = args.first().and_then(Value::as_str).unwrap_or_default();
        store.set(json!({ "searchValue": value }));
        Ok(Value::Null)
    });
    add(store, "lastPageEncountered", |store, args| async move {
        let page = args.first().cloned().unwrap_or(Value::Null);
        Ok(store
            .dispatch("pagination/setLastPage", vec![page])
            .await
            .unwrap_or(Value::Null))
    });
}

fn add<F, Fut>(store: &StoreRoot, name: &str, action: F)
where
    F: Fn(StoreHandle, Vec<Value>) -> Fut + 'static,
    Fut: Future<Output = ActionResult> + 'static,
{
    let handle = store.handle();
    store.add_root_action(name, move |args| action(handle.clone(), args));
}

fn snapshot(store: &StoreHandle) -> Value {
    Value::Object(store.state())
}

fn search_value(store: &StoreHandle) -> String {
    store
        .state()
        .get("searchValue")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn set_last_search_value(store: &StoreHandle) {
    let search = search_value(store);
    store.set(json!({ "lastSearchValue": search }));
}

async fn fetch_and_count(store: &StoreHandle) -> bool {
    let fetched = store.dispatch("items/getItems", vec![snapshot(store)]).await;
    store
        .dispatch("pagination/updateItemCounts", vec![snapshot(store)])
        .await;
    fetched == Some(Value::Bool(true))
}

async fn new_search(store: &StoreHandle) -> Result<Value> {
    let search = search_value(store);
    if search.trim().is_empty() {
        debug!("ignoring blank search");
        return Ok(json!(false));
    }
    debug!(search = %search, "new search");

    store.dispatch("ui/startLoading", vec![]).await;
    set_last_search_value(store);
    store.dispatch("pagination/reset", vec![snapshot(store)]).await;
    store.dispatch("items/clearCache", vec![]).await;
    let fetched = fetch_and_count(store).await;
    if fetched {
        store.dispatch("history/pushState", vec![snapshot(store)]).await;
    }
    store.dispatch("ui/stopLoading", vec![snapshot(store)]).await;
    Ok(json!(fetched))
}

async fn navigation_change(store: &StoreHandle, page_state: &Value) -> Result<Value> {
    let search = page_state
        .get("searchValue")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let page = page_state.get("currentPage").cloned().unwrap_or(Value::Null);
    debug!(search = %search, page = %page, "navigation change");

    store.dispatch("ui/startLoading", vec![]).await;
    let previous = store
        .state()
        .get("lastSearchValue")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    store.set(json!({ "searchValue": search }));
    if previous != search {
        store.dispatch("pagination/reset", vec![snapshot(store)]).await;
    }
    store.dispatch("pagination/setPage", vec![page]).await;
    set_last_search_value(store);
    let fetched = fetch_and_count(store).await;
    store.dispatch("ui/stopLoading", vec![snapshot(store)]).await;
    Ok(json!(fetched))
}

async fn move_page(store: &StoreHandle, pagination_action: &str) -> Result<Value> {
    store.dispatch("ui/startLoading", vec![]).await;
    store.dispatch(pagination_action, vec![]).await;
    set_last_search_value(store);
    let fetched = fetch_and_count(store).await;
    if fetched {
        store.dispatch("history/pushState", vec![snapshot(store)]).await;
    }
    store.dispatch("ui/stopLoading", vec![snapshot(store)]).await;
    Ok(json!(fetched))
}

async fn clear_state(store: &StoreHandle) -> Result<Value> {
    debug!("clearing search");
    store.set(json!({ "searchValue": "" }));
    store.dispatch("ui/reset", vec![]).await;
    Ok(Value::Null)
}
